//! Data models for convention records and local user state.
//!
//! Remote records mirror the API's PascalCase JSON. Fields the cache does not
//! interpret are kept in a flattened `extra` map, so re-persisting a record
//! never drops data the server sent.
//!
//! - `EventRecord`, `EventDayRecord`, `EventRoomRecord`, `EventTrackRecord`
//! - `DealerRecord`, `AnnouncementRecord`, `ImageRecord`, `MapRecord`
//! - `KnowledgeGroupRecord`, `KnowledgeEntryRecord`
//! - `TableRegistrationRecord` (artist alley), `CommunicationRecord`
//! - Local state: `AppSettings`, `ArtistAlleyDraft`, `Notification`

pub mod announcement;
pub mod artist_alley;
pub mod communication;
pub mod dealer;
pub mod event;
pub mod knowledge;
pub mod media;
pub mod notification;
pub mod settings;

pub use announcement::AnnouncementRecord;
pub use artist_alley::{ArtistAlleyDraft, TableRegistrationRecord};
pub use communication::CommunicationRecord;
pub use dealer::DealerRecord;
pub use event::{EventDayRecord, EventRecord, EventRoomRecord, EventTrackRecord};
pub use knowledge::{KnowledgeEntryRecord, KnowledgeGroupRecord};
pub use media::{ImageRecord, MapRecord};
pub use notification::{Notification, NotificationType};
pub use settings::{AppSettings, Theme};

/// Text a record contributes to search.
pub(crate) trait SearchText {
    fn search_text(&self) -> Option<&str>;
}

impl SearchText for String {
    fn search_text(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl SearchText for Option<String> {
    fn search_text(&self) -> Option<&str> {
        self.as_deref()
    }
}

/// Implements [`crate::store::Record`] for a model with the usual `id` and
/// `last_change_date_time_utc` fields, optionally naming searchable fields.
macro_rules! impl_record {
    ($ty:ty) => {
        impl_record!($ty, search: []);
    };
    ($ty:ty, search: [$($field:ident),* $(,)?]) => {
        impl $crate::store::Record for $ty {
            fn id(&self) -> &str {
                &self.id
            }

            fn last_change(&self) -> chrono::DateTime<chrono::Utc> {
                self.last_change_date_time_utc
            }

            fn search_fields(&self) -> Vec<&str> {
                #[allow(unused_imports)]
                use $crate::models::SearchText;
                #[allow(unused_mut)]
                let mut fields = Vec::new();
                $(
                    if let Some(text) = self.$field.search_text() {
                        fields.push(text);
                    }
                )*
                fields
            }
        }
    };
}

pub(crate) use impl_record;
