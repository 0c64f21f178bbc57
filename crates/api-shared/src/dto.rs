//! Wire types for the HTTP API.
//!
//! Request types carry raw strings for identifiers and enumerations and are converted into
//! validated core types with `into_*` / `TryFrom` before any service call, so malformed input is
//! always a validation error. Response types are built from core records with `From`.

use chrono::{DateTime, Utc};
use mindcare_core::companion::{CompanionReply, ReplySource};
use mindcare_core::models::{
    Appointment, AppointmentStatus, AppointmentUpdate, Assignment, ChatMessage, ChatThread,
    Content, ContentQuery, ContentType, ContentUpdate, EnergyLevel, Mood, MoodLog,
    NewAppointment, NewContent, NewMoodLog, NewPrescription, NewUser, Notification,
    Prescription, PrescriptionUpdate, ProfileUpdate, SendMessage, TherapistListing, User,
    UserUpdate,
};
use mindcare_core::{CoreResult, EmailAddress, NonEmptyText, RecordId, Role};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

fn parse_id(raw: &str) -> CoreResult<RecordId> {
    Ok(RecordId::parse(raw)?)
}

fn opt_text(raw: Option<String>) -> CoreResult<Option<NonEmptyText>> {
    Ok(raw.map(NonEmptyText::new).transpose()?)
}

fn opt_email(raw: Option<String>) -> CoreResult<Option<EmailAddress>> {
    Ok(raw.map(EmailAddress::parse).transpose()?)
}

// ============================================================================
// GENERAL
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every non-2xx response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CountRes {
    pub count: usize,
}

// ============================================================================
// USERS
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterReq {
    /// `patient` or `therapist`.
    pub role: String,
    pub display_name: String,
    pub email: String,
}

impl TryFrom<RegisterReq> for NewUser {
    type Error = mindcare_core::CoreError;

    fn try_from(req: RegisterReq) -> CoreResult<Self> {
        Ok(NewUser {
            role: Role::parse(&req.role)?,
            display_name: NonEmptyText::new(&req.display_name)?,
            email: EmailAddress::parse(&req.email)?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UserRes {
    pub id: String,
    pub role: String,
    pub display_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserRes {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            role: user.role.to_string(),
            display_name: user.display_name.into_inner(),
            email: user.email.to_string(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Admin update of any user.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserReq {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl TryFrom<UpdateUserReq> for UserUpdate {
    type Error = mindcare_core::CoreError;

    fn try_from(req: UpdateUserReq) -> CoreResult<Self> {
        Ok(UserUpdate {
            display_name: opt_text(req.display_name)?,
            email: opt_email(req.email)?,
            role: req.role.as_deref().map(Role::parse).transpose()?,
        })
    }
}

/// Update of the caller's own profile. Roles cannot be changed here.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileReq {
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl TryFrom<UpdateProfileReq> for ProfileUpdate {
    type Error = mindcare_core::CoreError;

    fn try_from(req: UpdateProfileReq) -> CoreResult<Self> {
        Ok(ProfileUpdate {
            display_name: opt_text(req.display_name)?,
            email: opt_email(req.email)?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TherapistRes {
    pub id: String,
    pub display_name: String,
}

impl From<TherapistListing> for TherapistRes {
    fn from(listing: TherapistListing) -> Self {
        Self {
            id: listing.id.to_string(),
            display_name: listing.display_name.into_inner(),
        }
    }
}

// ============================================================================
// ASSIGNMENTS
// ============================================================================

/// Replacement patient set for a therapist.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignReq {
    pub patient_ids: Vec<String>,
}

impl AssignReq {
    pub fn patient_ids(&self) -> CoreResult<Vec<RecordId>> {
        self.patient_ids.iter().map(|id| parse_id(id)).collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignmentRes {
    pub therapist_id: String,
    pub patient_ids: Vec<String>,
}

impl From<Assignment> for AssignmentRes {
    fn from(assignment: Assignment) -> Self {
        Self {
            therapist_id: assignment.therapist_id.to_string(),
            patient_ids: assignment
                .patient_ids
                .iter()
                .map(RecordId::to_string)
                .collect(),
        }
    }
}

// ============================================================================
// APPOINTMENTS
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct NewAppointmentReq {
    pub therapist_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl TryFrom<NewAppointmentReq> for NewAppointment {
    type Error = mindcare_core::CoreError;

    fn try_from(req: NewAppointmentReq) -> CoreResult<Self> {
        Ok(NewAppointment {
            therapist_id: parse_id(&req.therapist_id)?,
            scheduled_at: req.scheduled_at,
            notes: req.notes,
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateAppointmentReq {
    /// `scheduled`, `rescheduled`, `completed` or `cancelled`.
    pub status: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Reason recorded with a reschedule.
    pub reason: Option<String>,
}

impl TryFrom<UpdateAppointmentReq> for AppointmentUpdate {
    type Error = mindcare_core::CoreError;

    fn try_from(req: UpdateAppointmentReq) -> CoreResult<Self> {
        Ok(AppointmentUpdate {
            status: req
                .status
                .as_deref()
                .map(AppointmentStatus::parse)
                .transpose()?,
            scheduled_at: req.scheduled_at,
            notes: req.notes,
            reason: req.reason,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RescheduleRes {
    pub previous_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub rescheduled_by: String,
    pub rescheduled_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentRes {
    pub id: String,
    pub patient_id: String,
    pub therapist_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
    pub reschedule: Option<RescheduleRes>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentRes {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id.to_string(),
            patient_id: a.patient_id.to_string(),
            therapist_id: a.therapist_id.to_string(),
            scheduled_at: a.scheduled_at,
            status: a.status.to_string(),
            notes: a.notes,
            reschedule: a.reschedule.map(|r| RescheduleRes {
                previous_at: r.previous_at,
                reason: r.reason,
                rescheduled_by: r.rescheduled_by.to_string(),
                rescheduled_at: r.rescheduled_at,
            }),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

// ============================================================================
// MOOD LOGS
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct NewMoodReq {
    /// One of happy, calm, neutral, sad, anxious, angry, stressed, tired.
    pub mood: String,
    pub notes: Option<String>,
    /// Hours slept, 0 to 24.
    pub sleep_hours: Option<f32>,
    /// 1 to 10.
    pub energy_level: Option<u8>,
}

impl TryFrom<NewMoodReq> for NewMoodLog {
    type Error = mindcare_core::CoreError;

    fn try_from(req: NewMoodReq) -> CoreResult<Self> {
        let entry = NewMoodLog {
            mood: Mood::parse(&req.mood)?,
            notes: req.notes,
            sleep_hours: req.sleep_hours,
            energy_level: req.energy_level.map(EnergyLevel::new).transpose()?,
        };
        entry.validate()?;
        Ok(entry)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MoodLogRes {
    pub id: String,
    pub patient_id: String,
    pub mood: String,
    pub notes: Option<String>,
    pub sleep_hours: Option<f32>,
    pub energy_level: Option<u8>,
    pub logged_at: DateTime<Utc>,
}

impl From<MoodLog> for MoodLogRes {
    fn from(log: MoodLog) -> Self {
        Self {
            id: log.id.to_string(),
            patient_id: log.patient_id.to_string(),
            mood: log.mood.as_str().to_string(),
            notes: log.notes,
            sleep_hours: log.sleep_hours,
            energy_level: log.energy_level.map(|e| e.value()),
            logged_at: log.logged_at,
        }
    }
}

// ============================================================================
// PRESCRIPTIONS
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct NewPrescriptionReq {
    pub patient_id: String,
    pub notes: String,
    pub file_url: Option<String>,
}

impl TryFrom<NewPrescriptionReq> for NewPrescription {
    type Error = mindcare_core::CoreError;

    fn try_from(req: NewPrescriptionReq) -> CoreResult<Self> {
        Ok(NewPrescription {
            patient_id: parse_id(&req.patient_id)?,
            notes: req.notes,
            file_url: req.file_url,
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdatePrescriptionReq {
    pub notes: Option<String>,
    pub file_url: Option<String>,
    pub is_active: Option<bool>,
}

impl From<UpdatePrescriptionReq> for PrescriptionUpdate {
    fn from(req: UpdatePrescriptionReq) -> Self {
        PrescriptionUpdate {
            notes: req.notes,
            file_url: req.file_url,
            is_active: req.is_active,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionRes {
    pub id: String,
    pub patient_id: String,
    pub therapist_id: String,
    pub notes: String,
    pub file_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Prescription> for PrescriptionRes {
    fn from(p: Prescription) -> Self {
        Self {
            id: p.id.to_string(),
            patient_id: p.patient_id.to_string(),
            therapist_id: p.therapist_id.to_string(),
            notes: p.notes,
            file_url: p.file_url,
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

// ============================================================================
// CHAT & COMPANION
// ============================================================================

/// Either `thread_id` or `recipient_id` must be present.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SendMessageReq {
    pub thread_id: Option<String>,
    pub recipient_id: Option<String>,
    pub text: String,
}

impl TryFrom<SendMessageReq> for SendMessage {
    type Error = mindcare_core::CoreError;

    fn try_from(req: SendMessageReq) -> CoreResult<Self> {
        Ok(SendMessage {
            thread_id: req.thread_id.as_deref().map(parse_id).transpose()?,
            recipient_id: req.recipient_id.as_deref().map(parse_id).transpose()?,
            text: NonEmptyText::new(&req.text)?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatMessageRes {
    pub id: String,
    pub thread_id: String,
    pub sender_id: String,
    pub sender_role: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl From<ChatMessage> for ChatMessageRes {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id.to_string(),
            thread_id: m.thread_id.to_string(),
            sender_id: m.sender_id.to_string(),
            sender_role: m.sender_role.to_string(),
            text: m.text.into_inner(),
            sent_at: m.sent_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatThreadRes {
    pub id: String,
    pub patient_id: String,
    pub therapist_id: String,
    pub last_message: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<ChatThread> for ChatThreadRes {
    fn from(t: ChatThread) -> Self {
        Self {
            id: t.id.to_string(),
            patient_id: t.patient_id.to_string(),
            therapist_id: t.therapist_id.to_string(),
            last_message: t.last_message,
            last_updated: t.last_updated,
            created_at: t.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CompanionReq {
    pub message: String,
}

impl CompanionReq {
    pub fn text(&self) -> CoreResult<NonEmptyText> {
        Ok(NonEmptyText::new(&self.message)?)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CompanionRes {
    pub reply: String,
    /// Set when the message contained crisis indicators.
    pub crisis: bool,
    /// `model` or `fallback`.
    pub source: String,
}

impl From<CompanionReply> for CompanionRes {
    fn from(reply: CompanionReply) -> Self {
        Self {
            reply: reply.reply,
            crisis: reply.crisis,
            source: match reply.source {
                ReplySource::Model => "model",
                ReplySource::Fallback => "fallback",
            }
            .to_string(),
        }
    }
}

// ============================================================================
// CONTENT
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct NewContentReq {
    pub title: String,
    /// `video`, `article` or `exercise`.
    pub content_type: String,
    pub url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub description: Option<String>,
}

impl TryFrom<NewContentReq> for NewContent {
    type Error = mindcare_core::CoreError;

    fn try_from(req: NewContentReq) -> CoreResult<Self> {
        Ok(NewContent {
            title: NonEmptyText::new(&req.title)?,
            content_type: ContentType::parse(&req.content_type)?,
            url: req.url,
            tags: req.tags,
            description: req.description,
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateContentReq {
    pub title: Option<String>,
    pub content_type: Option<String>,
    pub url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub description: Option<String>,
}

impl TryFrom<UpdateContentReq> for ContentUpdate {
    type Error = mindcare_core::CoreError;

    fn try_from(req: UpdateContentReq) -> CoreResult<Self> {
        Ok(ContentUpdate {
            title: opt_text(req.title)?,
            content_type: req
                .content_type
                .as_deref()
                .map(ContentType::parse)
                .transpose()?,
            url: req.url,
            tags: req.tags,
            description: req.description,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContentQueryParams {
    /// Only content of this type.
    pub content_type: Option<String>,
    /// Only content carrying this tag (case-insensitive).
    pub tag: Option<String>,
}

impl TryFrom<ContentQueryParams> for ContentQuery {
    type Error = mindcare_core::CoreError;

    fn try_from(params: ContentQueryParams) -> CoreResult<Self> {
        Ok(ContentQuery {
            content_type: params
                .content_type
                .as_deref()
                .map(ContentType::parse)
                .transpose()?,
            tag: params.tag.filter(|t| !t.trim().is_empty()),
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ContentRes {
    pub id: String,
    pub title: String,
    pub content_type: String,
    pub url: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Content> for ContentRes {
    fn from(c: Content) -> Self {
        Self {
            id: c.id.to_string(),
            title: c.title.into_inner(),
            content_type: c.content_type.as_str().to_string(),
            url: c.url,
            tags: c.tags,
            description: c.description,
            owner_id: c.owner_id.to_string(),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationRes {
    pub id: String,
    /// Event kind, e.g. `new_message` or `therapist_assigned`.
    pub kind: String,
    pub message: String,
    #[schema(value_type = Object)]
    pub meta: serde_json::Value,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationRes {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id.to_string(),
            kind: n.kind.to_string(),
            message: n.message,
            meta: n.meta,
            read: n.read,
            created_at: n.created_at,
        }
    }
}
