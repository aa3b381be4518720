//! Seeded sampling of character and scenery tags.
//!
//! Every call builds its own generator from the seed, so a given seed always
//! yields the same tags and nothing is shared between calls.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

use crate::config::CharacterProfile;
use crate::models::Tag;
use crate::{Result, SkyframeError};

/// Scenic features mixed into every prompt
pub const ADDONS: [&str; 10] = [
    "ocean",
    "mountain",
    "lake",
    "forest",
    "river",
    "temple",
    "cliff",
    "waterfall",
    "hill",
    "village",
];

/// Number of addons picked per prompt
pub const ADDON_COUNT: usize = 2;

fn pick<'a>(rng: &mut StdRng, pool: &'a [String]) -> Option<&'a String> {
    if pool.is_empty() {
        return None;
    }
    pool.get(index::sample(rng, pool.len(), 1).index(0))
}

/// One tag from each appearance pool, per character.
///
/// Each character starts from a fresh generator, so characters with the
/// same pools get the same look. An empty pool is a configuration error.
pub fn character_tags(seed: u64, characters: &[CharacterProfile]) -> Result<Vec<Tag>> {
    let mut tags = Vec::with_capacity(characters.len() * 4);
    for (index, character) in characters.iter().enumerate() {
        let mut rng = StdRng::seed_from_u64(seed);
        for (name, pool) in character.pools() {
            let value = pick(&mut rng, pool).ok_or_else(|| {
                SkyframeError::configuration(format!(
                    "Character {index} has an empty {name} list"
                ))
            })?;
            tags.push(Tag::new(value.as_str()));
        }
    }
    Ok(tags)
}

/// Two distinct scenic features
#[must_use]
pub fn addon_tags(seed: u64) -> Vec<Tag> {
    let mut rng = StdRng::seed_from_u64(seed);
    index::sample(&mut rng, ADDONS.len(), ADDON_COUNT)
        .into_iter()
        .map(|i| Tag::new(ADDONS[i]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationProfile;
    use std::collections::HashSet;

    fn character() -> CharacterProfile {
        GenerationProfile::scenery().characters.remove(0)
    }

    #[test]
    fn test_addons_are_two_distinct_vocabulary_items() {
        for seed in 0..200 {
            let addons = addon_tags(seed);
            assert_eq!(addons.len(), ADDON_COUNT);
            let unique: HashSet<&str> = addons.iter().map(Tag::text).collect();
            assert_eq!(unique.len(), ADDON_COUNT, "seed {seed}: {addons:?}");
            assert!(addons.iter().all(|tag| ADDONS.contains(&tag.text())));
        }
    }

    #[test]
    fn test_addons_are_deterministic() {
        assert_eq!(addon_tags(5), addon_tags(5));
        assert_eq!(addon_tags(31), addon_tags(31));
    }

    #[test]
    fn test_addons_vary_with_seed() {
        let distinct: HashSet<Vec<Tag>> = (0..31).map(addon_tags).collect();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn test_four_tags_per_character() {
        let tags = character_tags(5, &[character()]).unwrap();
        assert_eq!(tags.len(), 4);

        let profile = character();
        for (tag, (_, pool)) in tags.iter().zip(profile.pools()) {
            assert!(pool.iter().any(|option| option == tag.text()));
        }
    }

    #[test]
    fn test_characters_with_same_pools_look_identical() {
        let tags = character_tags(12, &[character(), character()]).unwrap();
        assert_eq!(tags.len(), 8);
        assert_eq!(tags[..4], tags[4..]);
    }

    #[test]
    fn test_character_tags_are_deterministic() {
        let characters = [character()];
        assert_eq!(
            character_tags(7, &characters).unwrap(),
            character_tags(7, &characters).unwrap()
        );
    }

    #[test]
    fn test_no_characters_no_tags() {
        assert!(character_tags(5, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_single_option_pools() {
        let solo = CharacterProfile {
            hair_len: vec!["short hair".to_string()],
            hair_color: vec!["red hair".to_string()],
            position: vec!["sitting".to_string()],
            accessory: vec![String::new()],
        };
        let texts: Vec<String> = character_tags(3, &[solo])
            .unwrap()
            .iter()
            .map(|tag| tag.text().to_string())
            .collect();
        assert_eq!(texts, vec!["short hair", "red hair", "sitting", ""]);
    }

    #[test]
    fn test_empty_pool_is_a_configuration_error() {
        let mut bare = character();
        bare.position.clear();

        let err = character_tags(3, &[character(), bare]).unwrap_err();
        assert!(matches!(err, SkyframeError::Configuration { .. }));
        assert!(err.to_string().contains("Character 1 has an empty position list"));
    }
}
