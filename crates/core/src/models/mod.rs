//! Record types persisted by the core.

pub mod appointment;
pub mod assignment;
pub mod chat;
pub mod content;
pub mod mood;
pub mod notification;
pub mod prescription;
pub mod user;

pub use appointment::{
    Appointment, AppointmentStatus, AppointmentUpdate, NewAppointment, RescheduleMeta,
};
pub use assignment::{Assignment, AssignmentEdge};
pub use chat::{ChatMessage, ChatThread, SendMessage};
pub use content::{normalise_tags, Content, ContentQuery, ContentType, ContentUpdate, NewContent};
pub use mood::{EnergyLevel, Mood, MoodLog, NewMoodLog};
pub use notification::{Notification, NotificationDraft, NotificationKind};
pub use prescription::{NewPrescription, Prescription, PrescriptionUpdate};
pub use user::{NewUser, ProfileUpdate, TherapistListing, User, UserUpdate};
