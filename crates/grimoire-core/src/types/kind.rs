//! Entity and relationship kind definitions.
//!
//! Both are closed enums. Free-form type strings coming from collaborators or
//! gazetteer files are parsed at the boundary with `from_str_flexible`; anything
//! that does not map to a variant is rejected there and never travels further.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kinds of game-world entities that can be mentioned in narrative text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    /// Player character (e.g., "Thia", "Grom").
    Pc,
    /// Non-player character (e.g., "Lord Neverember").
    Npc,
    /// Place: city, dungeon, room, region (e.g., "Waterdeep").
    Location,
    /// Object, weapon, artifact or treasure (e.g., "+1 Longsword").
    Item,
    /// Creature or enemy (e.g., "Goblin", "Ancient Red Dragon").
    Monster,
    /// Organization or group (e.g., "Zhentarim").
    Faction,
    /// Quest or objective.
    Quest,
    /// Significant happening.
    Event,
    /// Game session metadata.
    Session,
    /// Spell (e.g., "Fireball").
    Spell,
    /// Character class (e.g., "Wizard").
    Class,
    /// Character race (e.g., "Half-Orc").
    Race,
    /// Game rule.
    Rule,
}

impl EntityKind {
    /// Parse an entity kind from a string with flexible matching.
    ///
    /// Handles the canonical labels ("NPC", "SPELL") in any case as well as the
    /// variants LLMs and statistical taggers tend to produce ("player character",
    /// "creature", "place", "organization").
    pub fn from_str_flexible(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");

        match normalized.as_str() {
            "pc" | "player_character" | "player" | "party_member" | "hero" => Some(Self::Pc),

            "npc" | "non_player_character" | "character" | "person" | "per" => Some(Self::Npc),

            "location" | "loc" | "place" | "city" | "town" | "dungeon" | "region" | "room"
            | "gpe" | "fac" | "area" => Some(Self::Location),

            "item" | "object" | "weapon" | "armor" | "armour" | "artifact" | "treasure"
            | "product" | "equipment" => Some(Self::Item),

            "monster" | "creature" | "enemy" | "beast" | "foe" => Some(Self::Monster),

            "faction" | "organization" | "organisation" | "org" | "group" | "guild" => {
                Some(Self::Faction)
            }

            "quest" | "objective" | "mission" => Some(Self::Quest),

            "event" | "evt" | "battle" | "occurrence" => Some(Self::Event),

            "session" => Some(Self::Session),

            "spell" | "cantrip" | "incantation" => Some(Self::Spell),

            "class" | "character_class" => Some(Self::Class),

            "race" | "species" | "ancestry" | "lineage" => Some(Self::Race),

            "rule" | "mechanic" => Some(Self::Rule),

            _ => None,
        }
    }

    /// Get all entity kind variants.
    pub fn all() -> &'static [EntityKind] {
        &[
            Self::Pc,
            Self::Npc,
            Self::Location,
            Self::Item,
            Self::Monster,
            Self::Faction,
            Self::Quest,
            Self::Event,
            Self::Session,
            Self::Spell,
            Self::Class,
            Self::Race,
            Self::Rule,
        ]
    }

    /// Canonical label, as used in gazetteer files and prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pc => "PC",
            Self::Npc => "NPC",
            Self::Location => "LOCATION",
            Self::Item => "ITEM",
            Self::Monster => "MONSTER",
            Self::Faction => "FACTION",
            Self::Quest => "QUEST",
            Self::Event => "EVENT",
            Self::Session => "SESSION",
            Self::Spell => "SPELL",
            Self::Class => "CLASS",
            Self::Race => "RACE",
            Self::Rule => "RULE",
        }
    }

    /// Short description used when prompting an LLM.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Pc => "Player characters (the party members)",
            Self::Npc => "Non-player characters",
            Self::Location => "Places (cities, dungeons, rooms, regions)",
            Self::Item => "Objects, weapons, artifacts, treasure",
            Self::Monster => "Creatures and enemies",
            Self::Faction => "Organizations and groups",
            Self::Quest => "Quest names or objectives mentioned",
            Self::Event => "Significant named happenings",
            Self::Session => "Game session metadata",
            Self::Spell => "Named spells that are cast",
            Self::Class => "Character classes",
            Self::Race => "Character races",
            Self::Rule => "Game rules",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_flexible(s).ok_or_else(|| format!("Unknown entity kind: {}", s))
    }
}

/// Relationship kinds reported between extracted entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    // Spatial
    LocatedIn,
    Contains,
    ConnectedTo,

    // Social
    Knows,
    AlliedWith,
    HostileTo,
    MemberOf,

    // Ownership
    Owns,
    Guards,

    // Quest/Narrative
    GaveQuest,
    Pursuing,
    Completed,
    ObjectiveAt,

    // Combat/Events
    Killed,
    ParticipatedIn,
    OccurredAt,
    OccurredIn,

    // Reference
    InstanceOf,
}

impl RelationshipKind {
    /// Parse relationship kind from string with flexible matching.
    pub fn from_str_flexible(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");

        match normalized.as_str() {
            "located_in" | "locatedin" | "in" | "at" | "found_in" | "resides_in" | "lives_in" => {
                Some(Self::LocatedIn)
            }
            "contains" | "holds" | "houses" => Some(Self::Contains),
            "connected_to" | "leads_to" | "adjacent_to" => Some(Self::ConnectedTo),

            "knows" | "know" | "met" | "acquainted_with" | "friends_with" => Some(Self::Knows),
            "allied_with" | "ally_of" | "allies_with" | "allied" => Some(Self::AlliedWith),
            "hostile_to" | "enemy_of" | "enemies_with" | "hostile" | "fights" => {
                Some(Self::HostileTo)
            }
            "member_of" | "belongs_to" | "part_of" | "works_for" => Some(Self::MemberOf),

            "owns" | "has" | "possesses" | "wields" | "carries" => Some(Self::Owns),
            "guards" | "protects" | "defends" => Some(Self::Guards),

            "gave_quest" | "quest_giver" | "assigned" => Some(Self::GaveQuest),
            "pursuing" | "pursues" | "on_quest" => Some(Self::Pursuing),
            "completed" | "finished" | "completes" => Some(Self::Completed),
            "objective_at" => Some(Self::ObjectiveAt),

            "killed" | "slew" | "slain_by" | "defeated" => Some(Self::Killed),
            "participated_in" | "took_part_in" | "fought_in" => Some(Self::ParticipatedIn),
            "occurred_at" | "happened_at" => Some(Self::OccurredAt),
            "occurred_in" | "happened_in" => Some(Self::OccurredIn),

            "instance_of" | "is_a" | "type_of" => Some(Self::InstanceOf),

            _ => None,
        }
    }

    /// Get all relationship kind variants.
    pub fn all() -> &'static [RelationshipKind] {
        &[
            Self::LocatedIn,
            Self::Contains,
            Self::ConnectedTo,
            Self::Knows,
            Self::AlliedWith,
            Self::HostileTo,
            Self::MemberOf,
            Self::Owns,
            Self::Guards,
            Self::GaveQuest,
            Self::Pursuing,
            Self::Completed,
            Self::ObjectiveAt,
            Self::Killed,
            Self::ParticipatedIn,
            Self::OccurredAt,
            Self::OccurredIn,
            Self::InstanceOf,
        ]
    }

    /// Canonical label for prompts and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocatedIn => "LOCATED_IN",
            Self::Contains => "CONTAINS",
            Self::ConnectedTo => "CONNECTED_TO",
            Self::Knows => "KNOWS",
            Self::AlliedWith => "ALLIED_WITH",
            Self::HostileTo => "HOSTILE_TO",
            Self::MemberOf => "MEMBER_OF",
            Self::Owns => "OWNS",
            Self::Guards => "GUARDS",
            Self::GaveQuest => "GAVE_QUEST",
            Self::Pursuing => "PURSUING",
            Self::Completed => "COMPLETED",
            Self::ObjectiveAt => "OBJECTIVE_AT",
            Self::Killed => "KILLED",
            Self::ParticipatedIn => "PARTICIPATED_IN",
            Self::OccurredAt => "OCCURRED_AT",
            Self::OccurredIn => "OCCURRED_IN",
            Self::InstanceOf => "INSTANCE_OF",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_flexible(s).ok_or_else(|| format!("Unknown relationship kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_from_str_flexible() {
        // Canonical labels
        assert_eq!(EntityKind::from_str_flexible("PC"), Some(EntityKind::Pc));
        assert_eq!(EntityKind::from_str_flexible("NPC"), Some(EntityKind::Npc));
        assert_eq!(EntityKind::from_str_flexible("SPELL"), Some(EntityKind::Spell));
        assert_eq!(EntityKind::from_str_flexible("MONSTER"), Some(EntityKind::Monster));

        // Case insensitive
        assert_eq!(EntityKind::from_str_flexible("spell"), Some(EntityKind::Spell));
        assert_eq!(EntityKind::from_str_flexible("Location"), Some(EntityKind::Location));

        // Variants
        assert_eq!(EntityKind::from_str_flexible("creature"), Some(EntityKind::Monster));
        assert_eq!(EntityKind::from_str_flexible("player character"), Some(EntityKind::Pc));
        assert_eq!(EntityKind::from_str_flexible("organization"), Some(EntityKind::Faction));
        assert_eq!(EntityKind::from_str_flexible("GPE"), Some(EntityKind::Location));

        // With whitespace
        assert_eq!(EntityKind::from_str_flexible("  item  "), Some(EntityKind::Item));

        // Unknown
        assert_eq!(EntityKind::from_str_flexible("VEHICLE"), None);
        assert_eq!(EntityKind::from_str_flexible(""), None);
    }

    #[test]
    fn test_relationship_kind_from_str_flexible() {
        assert_eq!(RelationshipKind::from_str_flexible("LOCATED_IN"), Some(RelationshipKind::LocatedIn));
        assert_eq!(RelationshipKind::from_str_flexible("allied with"), Some(RelationshipKind::AlliedWith));
        assert_eq!(RelationshipKind::from_str_flexible("hostile-to"), Some(RelationshipKind::HostileTo));
        assert_eq!(RelationshipKind::from_str_flexible("slew"), Some(RelationshipKind::Killed));
        assert_eq!(RelationshipKind::from_str_flexible("teleported"), None);
    }

    #[test]
    fn test_display_uses_canonical_labels() {
        assert_eq!(EntityKind::Npc.to_string(), "NPC");
        assert_eq!(EntityKind::Spell.to_string(), "SPELL");
        assert_eq!(RelationshipKind::MemberOf.to_string(), "MEMBER_OF");
    }

    #[test]
    fn test_all_variants_round_trip_through_labels() {
        for kind in EntityKind::all() {
            assert_eq!(EntityKind::from_str_flexible(kind.as_str()), Some(*kind));
        }
        for kind in RelationshipKind::all() {
            assert_eq!(RelationshipKind::from_str_flexible(kind.as_str()), Some(*kind));
        }
    }

    #[test]
    fn test_entity_kind_serde() {
        let json = serde_json::to_string(&EntityKind::Npc).unwrap();
        assert_eq!(json, "\"NPC\"");

        let parsed: EntityKind = serde_json::from_str("\"SPELL\"").unwrap();
        assert_eq!(parsed, EntityKind::Spell);

        let json = serde_json::to_string(&RelationshipKind::GaveQuest).unwrap();
        assert_eq!(json, "\"GAVE_QUEST\"");
    }
}
