//! Relationship accessors.
//!
//! Reverse and many-to-many relations are resolved on read by scanning the
//! child kind. Both backends keep foreign-key attributes and the place's
//! `amenity_ids` list on their records, so the same scan works for either.

use hbnb_core::{EntityKind, Record};
use serde_json::Value;

use super::{Result, Storage};

async fn children(
    storage: &dyn Storage,
    kind: EntityKind,
    column: &str,
    parent: &Record,
) -> Result<Vec<Record>> {
    Ok(storage
        .all(Some(kind))
        .await?
        .into_values()
        .filter(|child| child.get_str(column) == Some(parent.id().as_str()))
        .collect())
}

/// Cities whose `state_id` is the state's id.
pub async fn cities_of(storage: &dyn Storage, state: &Record) -> Result<Vec<Record>> {
    children(storage, EntityKind::City, "state_id", state).await
}

/// Places located in the city.
pub async fn places_of(storage: &dyn Storage, city: &Record) -> Result<Vec<Record>> {
    children(storage, EntityKind::Place, "city_id", city).await
}

/// Reviews of the place.
pub async fn reviews_of(storage: &dyn Storage, place: &Record) -> Result<Vec<Record>> {
    children(storage, EntityKind::Review, "place_id", place).await
}

/// Amenities listed in the place's `amenity_ids`.
pub async fn amenities_of(storage: &dyn Storage, place: &Record) -> Result<Vec<Record>> {
    let ids = amenity_ids(place);
    Ok(storage
        .all(Some(EntityKind::Amenity))
        .await?
        .into_values()
        .filter(|amenity| ids.iter().any(|id| id == amenity.id().as_str()))
        .collect())
}

/// Link an amenity to a place by appending its id to `amenity_ids`.
///
/// Returns `false` (and changes nothing) when `amenity` is not an Amenity or
/// is already linked.
pub fn link_amenity(place: &mut Record, amenity: &Record) -> bool {
    if amenity.kind() != EntityKind::Amenity {
        return false;
    }
    let mut ids = amenity_ids(place);
    if ids.iter().any(|id| id == amenity.id().as_str()) {
        return false;
    }
    ids.push(amenity.id().to_string());
    place.set("amenity_ids", Value::from(ids))
}

fn amenity_ids(place: &Record) -> Vec<String> {
    place
        .get("amenity_ids")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileStorage;
    use serde_json::json;

    fn with(kind: EntityKind, fields: Value) -> Record {
        let mut record = Record::new(kind);
        for (key, value) in fields.as_object().unwrap() {
            record.set(key, value.clone());
        }
        record
    }

    #[tokio::test]
    async fn test_cities_and_reviews_by_scan() {
        let mut storage = FileStorage::new("unused.json");
        let ca = with(EntityKind::State, json!({"name": "California"}));
        let nv = with(EntityKind::State, json!({"name": "Nevada"}));
        let sf = with(EntityKind::City, json!({"name": "San Francisco", "state_id": ca.id().as_str()}));
        let la = with(EntityKind::City, json!({"name": "Los Angeles", "state_id": ca.id().as_str()}));
        let reno = with(EntityKind::City, json!({"name": "Reno", "state_id": nv.id().as_str()}));
        let place = with(EntityKind::Place, json!({"city_id": sf.id().as_str(), "name": "Loft"}));
        let review = with(EntityKind::Review, json!({"place_id": place.id().as_str(), "text": "Great"}));

        for record in [&ca, &nv, &sf, &la, &reno, &place, &review] {
            storage.register_new(record.clone()).await.unwrap();
        }

        let mut names: Vec<String> = cities_of(&storage, &ca)
            .await
            .unwrap()
            .iter()
            .filter_map(|c| c.get_str("name").map(str::to_string))
            .collect();
        names.sort();
        assert_eq!(names, vec!["Los Angeles", "San Francisco"]);

        assert_eq!(places_of(&storage, &sf).await.unwrap().len(), 1);
        assert!(places_of(&storage, &reno).await.unwrap().is_empty());
        assert_eq!(reviews_of(&storage, &place).await.unwrap()[0].get_str("text"), Some("Great"));
    }

    #[tokio::test]
    async fn test_amenity_links() {
        let mut storage = FileStorage::new("unused.json");
        let wifi = with(EntityKind::Amenity, json!({"name": "Wifi"}));
        let pool = with(EntityKind::Amenity, json!({"name": "Pool"}));
        let not_amenity = Record::new(EntityKind::State);
        let mut place = Record::new(EntityKind::Place);

        assert!(link_amenity(&mut place, &wifi));
        assert!(!link_amenity(&mut place, &wifi));
        assert!(!link_amenity(&mut place, &not_amenity));
        assert_eq!(place.get("amenity_ids"), Some(&json!([wifi.id().as_str()])));

        storage.register_new(wifi.clone()).await.unwrap();
        storage.register_new(pool).await.unwrap();
        let linked = amenities_of(&storage, &place).await.unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id(), wifi.id());
    }
}
