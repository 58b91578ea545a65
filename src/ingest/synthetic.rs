// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Deterministic synthetic records for seeding development databases.
//!
//! The same seed always yields the same records; only timestamps vary with
//! the `now` passed in.

use super::Collection;
use crate::db::Fields;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};

const FIRST_NAMES: &[&str] = &[
    "Adriana", "Néstor", "Carlos", "José", "Paty", "Vale", "Luis", "Ana", "Roberto", "Lucía",
];
const ROLES: &[&str] = &["student", "admin", "teacher"];
const HISTORY_LANGS: &[&str] = &["es", "en", "fr", "de", "it"];
const HISTORY_WORDS: &[&str] = &["hola", "adiós", "árbol", "casa", "gracias", "perro", "gato"];
const OBJECT_LABELS: &[&str] = &["bottle", "cat", "dog", "laptop", "book", "phone"];
const OBJECT_LANGS: &[&str] = &["es", "en", "fr"];
const FLAG_KEYS: &[&str] = &["feature_x", "feature_y", "max_items", "beta_ui"];
const FLAG_TYPES: &[&str] = &["bool", "num", "str"];
const FLAG_STRINGS: &[&str] = &["on", "off", "gray"];
const FLAG_SCOPES: &[&str] = &["global", "user"];

/// Generate `count` records for `collection` from `seed`.
pub fn generate(
    collection: Collection,
    count: usize,
    seed: u64,
    now: DateTime<Utc>,
) -> Vec<Fields> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let ts = Value::String(format_utc_rfc3339(now));

    (0..count)
        .map(|i| {
            let record = match collection {
                Collection::Users => user(&mut rng, i, &ts),
                Collection::History => history(&mut rng, &ts),
                Collection::Objects => object(&mut rng, i, &ts),
                Collection::Flags => flag(&mut rng, &ts),
            };
            match record {
                Value::Object(fields) => fields,
                _ => Fields::new(),
            }
        })
        .collect()
}

fn pick<'a>(rng: &mut ChaCha8Rng, items: &[&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

fn uid(rng: &mut ChaCha8Rng) -> String {
    format!("uid_{}", rng.random_range(100..=999))
}

fn user(rng: &mut ChaCha8Rng, i: usize, ts: &Value) -> Value {
    let name = pick(rng, FIRST_NAMES);
    let slug = name.to_lowercase();
    json!({
        "email": format!("{slug}.{i}@example.com"),
        "displayName": format!("{name} #{i}"),
        "avatarUrl": format!("https://example.com/{slug}{i}.png"),
        "role": pick(rng, ROLES),
        "createdAt": ts,
    })
}

fn history(rng: &mut ChaCha8Rng, ts: &Value) -> Value {
    let source = pick(rng, HISTORY_LANGS);
    let targets: Vec<&str> = HISTORY_LANGS.iter().copied().filter(|l| *l != source).collect();
    let target = pick(rng, &targets);
    let text = pick(rng, HISTORY_WORDS);
    json!({
        "userId": uid(rng),
        "sourceLang": source,
        "targetLang": target,
        "inputType": "text",
        "text": text,
        "result": text.chars().rev().collect::<String>(),
        "ts": ts,
    })
}

fn object(rng: &mut ChaCha8Rng, i: usize, ts: &Value) -> Value {
    let label = pick(rng, OBJECT_LABELS);
    let confidence = (rng.random_range(0.7..0.99_f64) * 100.0).round() / 100.0;
    let mut langs = OBJECT_LANGS.to_vec();
    langs.shuffle(rng);
    langs.truncate(rng.random_range(1..=OBJECT_LANGS.len()));
    json!({
        "label": label,
        "confidence": confidence,
        "imageUrl": format!("https://example.com/img/{label}{i}.png"),
        "langs": langs,
        "createdBy": uid(rng),
        "ts": ts,
    })
}

fn flag(rng: &mut ChaCha8Rng, ts: &Value) -> Value {
    let key = pick(rng, FLAG_KEYS);
    let flag_type = pick(rng, FLAG_TYPES);
    let value = match flag_type {
        "num" => json!(rng.random_range(1..=100)),
        "str" => json!(pick(rng, FLAG_STRINGS)),
        _ => json!(rng.random_bool(0.5)),
    };
    json!({
        "key": key,
        "type": flag_type,
        "value": value,
        "scope": pick(rng, FLAG_SCOPES),
        "updatedAt": ts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_704_103_200, 0).unwrap()
    }

    #[test]
    fn same_seed_same_records() {
        for collection in [
            Collection::Users,
            Collection::History,
            Collection::Objects,
            Collection::Flags,
        ] {
            let a = generate(collection, 25, 1234, now());
            let b = generate(collection, 25, 1234, now());
            assert_eq!(a, b);
            assert_eq!(a.len(), 25);
        }
        assert_ne!(
            generate(Collection::Users, 5, 1, now()),
            generate(Collection::Users, 5, 2, now())
        );
    }

    #[test]
    fn history_translates_between_different_languages() {
        for row in generate(Collection::History, 50, 1234, now()) {
            assert_ne!(row["sourceLang"], row["targetLang"]);
            let text = row["text"].as_str().unwrap();
            let reversed: String = text.chars().rev().collect();
            assert_eq!(row["result"], reversed.as_str());
            assert_eq!(row["ts"], "2024-01-01T10:00:00.000Z");
        }
    }

    #[test]
    fn objects_have_bounded_confidence_and_langs() {
        for row in generate(Collection::Objects, 50, 1234, now()) {
            let confidence = row["confidence"].as_f64().unwrap();
            assert!((0.7..=0.99).contains(&confidence));
            let langs = row["langs"].as_array().unwrap();
            assert!((1..=3).contains(&langs.len()));
        }
    }

    #[test]
    fn flag_values_match_type() {
        for row in generate(Collection::Flags, 50, 1234, now()) {
            match row["type"].as_str().unwrap() {
                "bool" => assert!(row["value"].is_boolean()),
                "num" => assert!(row["value"].is_i64()),
                "str" => assert!(row["value"].is_string()),
                other => panic!("unexpected type {other}"),
            }
        }
    }
}
