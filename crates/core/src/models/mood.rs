use crate::constants::MOOD_LOGS_COLLECTION;
use crate::store::Document;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use mindcare_uuid::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Calm,
    Neutral,
    Sad,
    Anxious,
    Angry,
    Stressed,
    Tired,
}

impl Mood {
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "happy" => Ok(Self::Happy),
            "calm" => Ok(Self::Calm),
            "neutral" => Ok(Self::Neutral),
            "sad" => Ok(Self::Sad),
            "anxious" => Ok(Self::Anxious),
            "angry" => Ok(Self::Angry),
            "stressed" => Ok(Self::Stressed),
            "tired" => Ok(Self::Tired),
            other => Err(CoreError::InvalidInput(format!("unknown mood '{}'", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Calm => "calm",
            Self::Neutral => "neutral",
            Self::Sad => "sad",
            Self::Anxious => "anxious",
            Self::Angry => "angry",
            Self::Stressed => "stressed",
            Self::Tired => "tired",
        }
    }
}

/// Self-reported energy on a 1–10 scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct EnergyLevel(u8);

impl EnergyLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> CoreResult<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CoreError::InvalidInput(format!(
                "energy level must be between {} and {}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for EnergyLevel {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EnergyLevel> for u8 {
    fn from(level: EnergyLevel) -> Self {
        level.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoodLog {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub mood: Mood,
    pub notes: Option<String>,
    pub sleep_hours: Option<f32>,
    pub energy_level: Option<EnergyLevel>,
    pub logged_at: DateTime<Utc>,
}

impl Document for MoodLog {
    const COLLECTION: &'static str = MOOD_LOGS_COLLECTION;

    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Clone, Debug)]
pub struct NewMoodLog {
    pub mood: Mood,
    pub notes: Option<String>,
    pub sleep_hours: Option<f32>,
    pub energy_level: Option<EnergyLevel>,
}

impl NewMoodLog {
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(hours) = self.sleep_hours {
            if !hours.is_finite() || !(0.0..=24.0).contains(&hours) {
                return Err(CoreError::InvalidInput(
                    "sleep hours must be between 0 and 24".into(),
                ));
            }
        }
        Ok(())
    }
}
