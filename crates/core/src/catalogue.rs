//! Catalogue records and wire models
//!
//! Wire models mirror the JSON returned by the PokeAPI endpoints the
//! application reads. Transformation functions turn them into the domain
//! records the pipelines work with.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Pseudo-types listed by `GET /type` that no creature belongs to in practice.
pub const SENTINEL_TYPES: [&str; 2] = ["unknown", "shadow"];

/// `GET /pokemon?limit=L&offset=O`
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexResponse {
    pub count: usize,
    pub results: Vec<NamedResource>,
}

/// A `{name, url}` pair as it appears in list responses
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// `GET /pokemon/{idOrName}`
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PokemonResponse {
    pub id: u32,
    pub name: String,
    pub sprites: Sprites,
    pub types: Vec<TypeSlot>,
    pub height: u32,
    pub weight: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Sprites {
    pub front_default: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TypeSlot {
    #[serde(rename = "type")]
    pub type_ref: NamedResource,
}

/// `GET /type`
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TypeListResponse {
    pub results: Vec<NamedResource>,
}

/// `GET /type/{name}`
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TypeResponse {
    pub pokemon: Vec<TypeMember>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TypeMember {
    pub pokemon: NamedResource,
}

/// Lightweight reference to a catalogue entity
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CreatureSummary {
    pub name: String,
    pub url: String,
    pub id: u32,
}

/// Full record for one entity
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CreatureDetail {
    pub id: u32,
    pub name: String,
    pub image_url: Option<String>,
    /// Type names in the order the API lists them.
    pub types: Vec<String>,
    pub height: u32,
    pub weight: u32,
}

fn trailing_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/(\d+)/?$").expect("valid regex"))
}

/// Extract the numeric id from the trailing path segment of a resource URL
///
/// `https://pokeapi.co/api/v2/pokemon/25/` yields `Some(25)`.
pub fn parse_id_from_url(url: &str) -> Option<u32> {
    trailing_id_regex()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Transform an index page into summaries, dropping entries without a numeric id
pub fn transform_index(response: IndexResponse) -> Vec<CreatureSummary> {
    response
        .results
        .into_iter()
        .filter_map(|resource| {
            let id = parse_id_from_url(&resource.url)?;
            Some(CreatureSummary {
                name: resource.name,
                url: resource.url,
                id,
            })
        })
        .collect()
}

pub fn transform_detail(response: PokemonResponse) -> CreatureDetail {
    CreatureDetail {
        id: response.id,
        name: response.name,
        image_url: response.sprites.front_default,
        types: response
            .types
            .into_iter()
            .map(|slot| slot.type_ref.name)
            .collect(),
        height: response.height,
        weight: response.weight,
    }
}

/// Type names from the type listing, without the sentinel pseudo-types
pub fn transform_type_names(response: TypeListResponse) -> Vec<String> {
    response
        .results
        .into_iter()
        .map(|resource| resource.name)
        .filter(|name| !SENTINEL_TYPES.contains(&name.as_str()))
        .collect()
}

pub fn transform_type_members(response: TypeResponse) -> HashSet<String> {
    response
        .pokemon
        .into_iter()
        .map(|member| member.pokemon.name)
        .collect()
}

/// Uppercase the first character of a name, as names are displayed
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Zero-padded display id (`#001`)
pub fn display_id(id: u32) -> String {
    format!("#{id:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_from_url_trailing_slash() {
        assert_eq!(
            parse_id_from_url("https://pokeapi.co/api/v2/pokemon/25/"),
            Some(25)
        );
    }

    #[test]
    fn test_parse_id_from_url_no_trailing_slash() {
        assert_eq!(
            parse_id_from_url("https://pokeapi.co/api/v2/pokemon/151"),
            Some(151)
        );
    }

    #[test]
    fn test_parse_id_from_url_non_numeric() {
        assert_eq!(
            parse_id_from_url("https://pokeapi.co/api/v2/pokemon/pikachu/"),
            None
        );
        assert_eq!(parse_id_from_url(""), None);
    }

    #[test]
    fn test_transform_index_parses_ids() {
        let json = r#"{
            "count": 1302,
            "next": "https://pokeapi.co/api/v2/pokemon?offset=2&limit=2",
            "previous": null,
            "results": [
                {"name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon/1/"},
                {"name": "ivysaur", "url": "https://pokeapi.co/api/v2/pokemon/2/"}
            ]
        }"#;
        let response: IndexResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.count, 1302);

        let summaries = transform_index(response);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, 1);
        assert_eq!(summaries[0].name, "bulbasaur");
        assert_eq!(summaries[1].id, 2);
    }

    #[test]
    fn test_transform_index_drops_malformed_urls() {
        let response = IndexResponse {
            count: 2,
            results: vec![
                NamedResource {
                    name: "good".to_string(),
                    url: "https://pokeapi.co/api/v2/pokemon/7/".to_string(),
                },
                NamedResource {
                    name: "bad".to_string(),
                    url: "not a url".to_string(),
                },
            ],
        };

        let summaries = transform_index(response);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "good");
    }

    #[test]
    fn test_transform_detail_keeps_type_order() {
        let json = r#"{
            "id": 6,
            "name": "charizard",
            "sprites": {"front_default": "https://img/6.png", "back_default": null},
            "types": [
                {"slot": 1, "type": {"name": "fire", "url": "https://pokeapi.co/api/v2/type/10/"}},
                {"slot": 2, "type": {"name": "flying", "url": "https://pokeapi.co/api/v2/type/3/"}}
            ],
            "height": 17,
            "weight": 905,
            "base_experience": 267
        }"#;
        let response: PokemonResponse = serde_json::from_str(json).unwrap();

        let detail = transform_detail(response);

        assert_eq!(detail.id, 6);
        assert_eq!(detail.name, "charizard");
        assert_eq!(detail.image_url.as_deref(), Some("https://img/6.png"));
        assert_eq!(detail.types, vec!["fire", "flying"]);
        assert_eq!(detail.height, 17);
        assert_eq!(detail.weight, 905);
    }

    #[test]
    fn test_transform_detail_missing_sprite() {
        let json = r#"{
            "id": 10001,
            "name": "deoxys-attack",
            "sprites": {"front_default": null},
            "types": [],
            "height": 17,
            "weight": 608
        }"#;
        let response: PokemonResponse = serde_json::from_str(json).unwrap();

        let detail = transform_detail(response);

        assert_eq!(detail.image_url, None);
        assert!(detail.types.is_empty());
    }

    #[test]
    fn test_transform_type_names_excludes_sentinels() {
        let json = r#"{
            "count": 4,
            "results": [
                {"name": "normal", "url": "u"},
                {"name": "fire", "url": "u"},
                {"name": "unknown", "url": "u"},
                {"name": "shadow", "url": "u"}
            ]
        }"#;
        let response: TypeListResponse = serde_json::from_str(json).unwrap();

        assert_eq!(transform_type_names(response), vec!["normal", "fire"]);
    }

    #[test]
    fn test_transform_type_members() {
        let json = r#"{
            "id": 10,
            "name": "fire",
            "pokemon": [
                {"pokemon": {"name": "charmander", "url": "u"}, "slot": 1},
                {"pokemon": {"name": "charizard", "url": "u"}, "slot": 1}
            ]
        }"#;
        let response: TypeResponse = serde_json::from_str(json).unwrap();

        let members = transform_type_members(response);

        assert_eq!(members.len(), 2);
        assert!(members.contains("charmander"));
        assert!(members.contains("charizard"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("bulbasaur"), "Bulbasaur");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("mr-mime"), "Mr-mime");
    }

    #[test]
    fn test_display_id_pads() {
        assert_eq!(display_id(1), "#001");
        assert_eq!(display_id(25), "#025");
        assert_eq!(display_id(1025), "#1025");
    }
}
