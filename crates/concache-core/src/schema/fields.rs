//! Every persisted field of the cache.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::codec;
use super::{EntityField, Field, FieldKind, FieldVisitor, SortDirection, SortKey, SortSpec};
use crate::models::{
    AnnouncementRecord, AppSettings, ArtistAlleyDraft, CommunicationRecord, DealerRecord,
    EventDayRecord, EventRecord, EventRoomRecord, EventTrackRecord, ImageRecord,
    KnowledgeEntryRecord, KnowledgeGroupRecord, MapRecord, Notification, TableRegistrationRecord,
};
use crate::store::EntityStore;

macro_rules! value_field {
    ($(#[$meta:meta])* $name:ident, $key:literal, $kind:ident, $ty:ty, $default:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Field for $name {
            type Value = $ty;

            const NAME: &'static str = $key;
            const KIND: FieldKind = FieldKind::$kind;

            fn default_value() -> $ty {
                $default
            }

            fn hydrate(text: &str) -> serde_json::Result<$ty> {
                codec::hydrate_value(text, Self::default_value)
            }

            fn dehydrate(value: &$ty) -> serde_json::Result<String> {
                codec::dehydrate_value(value)
            }
        }
    };
}

macro_rules! optional_field {
    ($(#[$meta:meta])* $name:ident, $key:literal, $ty:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Field for $name {
            type Value = Option<$ty>;

            const NAME: &'static str = $key;
            const KIND: FieldKind = FieldKind::Value;

            fn default_value() -> Option<$ty> {
                None
            }

            fn hydrate(text: &str) -> serde_json::Result<Option<$ty>> {
                codec::hydrate_optional(text)
            }

            fn dehydrate(value: &Option<$ty>) -> serde_json::Result<String> {
                codec::dehydrate_optional(value)
            }
        }
    };
}

macro_rules! entity_field {
    (
        $(#[$meta:meta])*
        $name:ident, $key:literal, $record:ty,
        endpoint: $endpoint:literal,
        authenticated: $auth:literal,
        sort_by: $by:literal $direction:ident,
        |$r:ident| $sort:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Field for $name {
            type Value = EntityStore<$record>;

            const NAME: &'static str = $key;
            const KIND: FieldKind = FieldKind::Entity;
            const SORT: Option<SortSpec> = Some(SortSpec {
                by: $by,
                direction: SortDirection::$direction,
            });

            fn default_value() -> EntityStore<$record> {
                EntityStore::empty()
            }

            fn hydrate(text: &str) -> serde_json::Result<EntityStore<$record>> {
                codec::hydrate_entities::<Self>(text)
            }

            fn dehydrate(value: &EntityStore<$record>) -> serde_json::Result<String> {
                codec::dehydrate_entities::<Self>(value)
            }

            fn normalize(value: EntityStore<$record>) -> EntityStore<$record> {
                Self::build_store(value.as_slice().to_vec())
            }
        }

        impl EntityField for $name {
            type Record = $record;

            const ENDPOINT: &'static str = $endpoint;
            const AUTHENTICATED: bool = $auth;
            const DIRECTION: SortDirection = SortDirection::$direction;

            fn sort_key($r: &$record) -> SortKey<'_> {
                $sort
            }

            fn into_value(store: EntityStore<$record>) -> EntityStore<$record> {
                store
            }

            fn as_store(value: &EntityStore<$record>) -> &EntityStore<$record> {
                value
            }
        }
    };
}

// ===== Internal =====

value_field!(
    /// Convention the cached data belongs to
    Cid, "cid", Internal, String, String::new()
);
value_field!(
    /// Format version of the persisted cache
    CacheVersion, "cacheVersion", Internal, u32, 0
);
value_field!(
    LastSynchronised, "lastSynchronised", Internal, DateTime<Utc>, DateTime::<Utc>::UNIX_EPOCH
);
value_field!(
    /// Whether the last sync ran with credentials
    LastSyncAuthorized, "lastSyncAuthorized", Internal, bool, false
);

// ===== Values =====

value_field!(Settings, "settings", Value, AppSettings, AppSettings::default());
value_field!(
    /// Last time the user looked at an item, keyed by item id
    LastViewTimes, "lastViewTimes", Value, BTreeMap<String, DateTime<Utc>>, BTreeMap::new()
);
value_field!(
    /// Dismissed warning flags, keyed by warning name
    Warnings, "warnings", Value, BTreeMap<String, bool>, BTreeMap::new()
);
value_field!(
    /// Reminders currently known to be scheduled
    Notifications, "notifications", Value, Vec<Notification>, Vec::new()
);
optional_field!(
    /// Unsubmitted artist-alley registration form
    ArtistAlleyLocal, "artistAlleyLocalRegistration", ArtistAlleyDraft
);

// ===== Entities =====

entity_field!(
    Events, "events", EventRecord,
    endpoint: "Events",
    authenticated: false,
    sort_by: "StartDateTimeUtc" Ascending,
    |r| SortKey::Time(r.start_date_time_utc)
);
entity_field!(
    EventDays, "eventDays", EventDayRecord,
    endpoint: "EventConferenceDays",
    authenticated: false,
    sort_by: "Date" Ascending,
    |r| SortKey::Text(&r.date)
);
entity_field!(
    EventRooms, "eventRooms", EventRoomRecord,
    endpoint: "EventConferenceRooms",
    authenticated: false,
    sort_by: "Name" Ascending,
    |r| SortKey::Text(&r.name)
);
entity_field!(
    EventTracks, "eventTracks", EventTrackRecord,
    endpoint: "EventConferenceTracks",
    authenticated: false,
    sort_by: "Name" Ascending,
    |r| SortKey::Text(&r.name)
);
entity_field!(
    Dealers, "dealers", DealerRecord,
    endpoint: "Dealers",
    authenticated: false,
    sort_by: "DisplayName" Ascending,
    |r| SortKey::Text(r.name())
);
entity_field!(
    Announcements, "announcements", AnnouncementRecord,
    endpoint: "Announcements",
    authenticated: false,
    sort_by: "ValidFromDateTimeUtc" Descending,
    |r| SortKey::Time(r.valid_from_date_time_utc)
);
entity_field!(
    Images, "images", ImageRecord,
    endpoint: "Images",
    authenticated: false,
    sort_by: "ContentHashSha1" Ascending,
    |r| SortKey::Text(&r.content_hash_sha1)
);
entity_field!(
    Maps, "maps", MapRecord,
    endpoint: "Maps",
    authenticated: false,
    sort_by: "Order" Ascending,
    |r| SortKey::Order(r.order)
);
entity_field!(
    KnowledgeGroups, "knowledgeGroups", KnowledgeGroupRecord,
    endpoint: "KnowledgeGroups",
    authenticated: false,
    sort_by: "Order" Ascending,
    |r| SortKey::Order(r.order)
);
entity_field!(
    KnowledgeEntries, "knowledgeEntries", KnowledgeEntryRecord,
    endpoint: "KnowledgeEntries",
    authenticated: false,
    sort_by: "Order" Ascending,
    |r| SortKey::Order(r.order)
);
entity_field!(
    ArtistAlley, "artistAlley", TableRegistrationRecord,
    endpoint: "ArtistsAlley",
    authenticated: false,
    sort_by: "DisplayName" Ascending,
    |r| SortKey::Text(&r.display_name)
);
entity_field!(
    Communications, "communications", CommunicationRecord,
    endpoint: "Communication/PrivateMessages",
    authenticated: true,
    sort_by: "CreatedDateTimeUtc" Ascending,
    |r| SortKey::Time(r.created_date_time_utc)
);

/// Visit every field of the schema in declaration order.
pub fn visit_all<V: FieldVisitor>(visitor: &mut V) {
    visitor.visit::<Cid>();
    visitor.visit::<CacheVersion>();
    visitor.visit::<LastSynchronised>();
    visitor.visit::<LastSyncAuthorized>();

    visitor.visit::<Settings>();
    visitor.visit::<LastViewTimes>();
    visitor.visit::<Warnings>();
    visitor.visit::<Notifications>();
    visitor.visit::<ArtistAlleyLocal>();

    visitor.visit::<Events>();
    visitor.visit::<EventDays>();
    visitor.visit::<EventRooms>();
    visitor.visit::<EventTracks>();
    visitor.visit::<Dealers>();
    visitor.visit::<Announcements>();
    visitor.visit::<Images>();
    visitor.visit::<Maps>();
    visitor.visit::<KnowledgeGroups>();
    visitor.visit::<KnowledgeEntries>();
    visitor.visit::<ArtistAlley>();
    visitor.visit::<Communications>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{field_names, find_field, schema};
    use crate::store::Record;
    use serde_json::json;

    struct DefaultsRoundTrip(usize);

    impl FieldVisitor for DefaultsRoundTrip {
        fn visit<F: Field>(&mut self) {
            let default = F::default_value();
            let text = F::dehydrate(&default).unwrap();
            assert_eq!(F::hydrate(&text).unwrap(), default, "field {}", F::NAME);
            // The sentinel hydrates to the default as well
            assert_eq!(F::hydrate("undefined").unwrap(), default, "field {}", F::NAME);
            self.0 += 1;
        }
    }

    #[test]
    fn test_every_default_round_trips() {
        let mut visitor = DefaultsRoundTrip(0);
        visit_all(&mut visitor);
        assert_eq!(visitor.0, schema().len());
    }

    #[test]
    fn test_field_names_are_unique() {
        let mut names = field_names();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_registry_metadata() {
        let events = find_field("events").unwrap();
        assert_eq!(events.kind, FieldKind::Entity);
        assert_eq!(
            events.sort,
            Some(SortSpec {
                by: "StartDateTimeUtc",
                direction: SortDirection::Ascending
            })
        );
        assert_eq!(find_field("cid").unwrap().kind, FieldKind::Internal);
        assert_eq!(find_field("settings").unwrap().sort, None);
        assert!(find_field("nope").is_none());
        assert!(schema()
            .iter()
            .filter(|s| s.kind == FieldKind::Entity)
            .all(|s| s.sort.is_some()));
    }

    #[test]
    fn test_optional_field_writes_sentinel() {
        assert_eq!(ArtistAlleyLocal::dehydrate(&None).unwrap(), "undefined");
        assert_eq!(ArtistAlleyLocal::hydrate("null").unwrap(), None);

        let draft = ArtistAlleyDraft {
            display_name: "Studio Fox".to_string(),
            ..Default::default()
        };
        let text = ArtistAlleyLocal::dehydrate(&Some(draft.clone())).unwrap();
        assert_eq!(ArtistAlleyLocal::hydrate(&text).unwrap(), Some(draft));
    }

    #[test]
    fn test_entity_hydration_sorts_and_indexes() {
        let text = json!([
            {"Id": "late", "LastChangeDateTimeUtc": "2025-01-01T00:00:00Z",
             "Title": "Closing", "StartDateTimeUtc": "2025-08-17T18:00:00Z"},
            {"Id": "early", "LastChangeDateTimeUtc": "2025-01-01T00:00:00Z",
             "Title": "Opening", "StartDateTimeUtc": "2025-08-13T18:00:00Z"}
        ])
        .to_string();
        let store = Events::hydrate(&text).unwrap();
        let ids: Vec<&str> = store.iter().map(Record::id).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert_eq!(store.get("late").unwrap().title, "Closing");
    }

    #[test]
    fn test_entity_dehydrate_writes_only_the_list() {
        let text = json!([
            {"Id": "d1", "LastChangeDateTimeUtc": "2025-01-01T00:00:00Z", "DisplayName": "Zed"},
            {"Id": "d2", "LastChangeDateTimeUtc": "2025-01-01T00:00:00Z", "DisplayName": "amy"}
        ])
        .to_string();
        let store = Dealers::hydrate(&text).unwrap();
        let written = Dealers::dehydrate(&store).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["Id"], "d2");

        let mut before: Vec<&str> = store.iter().map(Record::id).collect();
        let again = Dealers::hydrate(&written).unwrap();
        let mut after: Vec<&str> = again.iter().map(Record::id).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn test_announcements_newest_first() {
        let text = json!([
            {"Id": "old", "LastChangeDateTimeUtc": "2025-01-01T00:00:00Z",
             "ValidFromDateTimeUtc": "2025-08-01T00:00:00Z"},
            {"Id": "new", "LastChangeDateTimeUtc": "2025-01-01T00:00:00Z",
             "ValidFromDateTimeUtc": "2025-08-02T00:00:00Z"}
        ])
        .to_string();
        let store = Announcements::hydrate(&text).unwrap();
        assert_eq!(store.as_slice()[0].id, "new");
    }

    #[test]
    fn test_order_based_collections_are_idempotent() {
        let text = json!([
            {"Id": "g2", "LastChangeDateTimeUtc": "2025-01-01T00:00:00Z", "Order": 2},
            {"Id": "g1a", "LastChangeDateTimeUtc": "2025-01-01T00:00:00Z", "Order": 1},
            {"Id": "g1b", "LastChangeDateTimeUtc": "2025-01-01T00:00:00Z", "Order": 1}
        ])
        .to_string();
        let store = KnowledgeGroups::hydrate(&text).unwrap();
        let ids: Vec<&str> = store.iter().map(Record::id).collect();
        assert_eq!(ids, vec!["g1a", "g1b", "g2"]);

        let resorted = KnowledgeGroups::normalize(store.clone());
        assert_eq!(resorted, store);
    }

    #[test]
    fn test_corrupt_text_is_an_error() {
        assert!(Events::hydrate("[{\"Id\": 5}]").is_err());
        assert!(Settings::hydrate("{{").is_err());
        assert!(CacheVersion::hydrate("\"seven\"").is_err());
    }
}
