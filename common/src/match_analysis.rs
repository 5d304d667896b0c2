use uuid::Uuid;

text_enum! {
    pub enum Side {
        Home => "home",
        Away => "away",
    }
}

text_enum! {
    /// Position code of a player on the pitch.
    pub enum Position {
        Goalkeeper => "GK",
        CenterBack => "CB",
        LeftBack => "LB",
        RightBack => "RB",
        DefensiveMidfield => "CDM",
        CentralMidfield => "CM",
        AttackingMidfield => "CAM",
        LeftWing => "LW",
        RightWing => "RW",
        Striker => "ST",
    }
}

text_enum! {
    pub enum EventType {
        Pass => "pass",
        Shot => "shot",
        Dribble => "dribble",
        Tackle => "tackle",
        Foul => "foul",
        Goal => "goal",
        Card => "card",
    }
}

text_enum! {
    pub enum Outcome {
        Successful => "successful",
        Failed => "failed",
    }
}

text_enum! {
    pub enum AutoFlag {
        Good => "good",
        Bad => "bad",
        None => "none",
    }
}

impl AutoFlag {
    /// `good` for confident successes, `bad` for low confidence or failures.
    pub fn derive(confidence: f64, outcome: Outcome) -> Self {
        if confidence > 0.9 && outcome == Outcome::Successful {
            AutoFlag::Good
        } else if confidence < 0.5 || outcome == Outcome::Failed {
            AutoFlag::Bad
        } else {
            AutoFlag::None
        }
    }
}

/// A position on the pitch, normalized to the unit square.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: Uuid,
    pub game_id: Uuid,
    pub name: String,
    pub position: Position,
    pub side: Side,
    pub jersey_number: u8,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub game_id: Uuid,
    /// Seconds since kick-off.
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Unset when detection could not resolve the player.
    pub player_id: Option<Uuid>,
    pub player_name: Option<String>,
    pub side: Side,
    pub start_position: Point,
    pub end_position: Option<Point>,
    pub outcome: Outcome,
    pub confidence: f64,
    pub auto_flag: AutoFlag,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormationPlayerPosition {
    pub player_id: Option<Uuid>,
    pub player_name: String,
    pub position: Point,
    pub role: Position,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormationSnapshot {
    pub id: Uuid,
    pub game_id: Uuid,
    pub timestamp: u32,
    pub side: Side,
    pub formation: String,
    pub confidence: f64,
    pub players: Vec<FormationPlayerPosition>,
    pub owner: String,
}

/// Values that no analysis produces yet.
///
/// Everything under `Placeholder` is random filler. A real estimator would
/// add its own variant instead of overwriting derived fields.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "source", content = "values", rename_all = "snake_case")]
pub enum Enrichment<T> {
    Placeholder(T),
}

impl<T> Enrichment<T> {
    pub fn values(&self) -> &T {
        match self {
            Enrichment::Placeholder(v) => v,
        }
    }
}

/// Per-player counts computed from the event set alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEventStats {
    pub touches: u32,
    pub passes: u32,
    pub passes_completed: u32,
    pub shots: u32,
    pub shots_on_target: u32,
    pub dribbles: u32,
    pub dribbles_successful: u32,
    pub recoveries: u32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEnrichment {
    pub minutes_played: u32,
    pub key_passes: u32,
    pub assists: u32,
    pub goals: u32,
    pub turnovers: u32,
    pub fouls: u32,
    pub cards: u32,
    #[serde(rename = "xG")]
    pub expected_goals: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub player_name: String,
    pub derived: PlayerEventStats,
    pub enrichment: Enrichment<PlayerEnrichment>,
    pub owner: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamEventStats {
    pub passes: u32,
    pub passes_completed: u32,
    /// Percentage of completed passes, 0 when the side made no passes.
    pub pass_accuracy: f64,
    pub shots: u32,
    pub shots_on_target: u32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamEnrichment {
    pub possession: f64,
    pub corners: u32,
    pub fouls: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub formation: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    pub game_id: Uuid,
    pub side: Side,
    pub derived: TeamEventStats,
    pub enrichment: Enrichment<TeamEnrichment>,
    pub owner: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn auto_flag_rules() {
        assert_eq!(AutoFlag::derive(0.95, Outcome::Successful), AutoFlag::Good);
        assert_eq!(AutoFlag::derive(0.9, Outcome::Successful), AutoFlag::None);
        assert_eq!(AutoFlag::derive(0.95, Outcome::Failed), AutoFlag::Bad);
        assert_eq!(AutoFlag::derive(0.75, Outcome::Successful), AutoFlag::None);
    }

    // Only reachable with confidences below the generated [0.7, 1.0] range.
    #[test]
    fn auto_flag_low_confidence_is_bad() {
        assert_eq!(AutoFlag::derive(0.49, Outcome::Successful), AutoFlag::Bad);
    }

    #[test]
    fn enrichment_is_tagged() {
        let value = Enrichment::Placeholder(TeamEnrichment {
            possession: 60.0,
            corners: 4,
            fouls: 10,
            yellow_cards: 1,
            red_cards: 0,
            formation: "4-3-3".to_owned(),
        });

        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["source"], "placeholder");
        assert_eq!(json["values"]["yellowCards"], 1);
    }

    #[test]
    fn event_type_field_name() {
        let event = Event {
            id: Uuid::nil(),
            game_id: Uuid::nil(),
            timestamp: 12.5,
            event_type: EventType::Shot,
            player_id: None,
            player_name: None,
            side: Side::Away,
            start_position: Point::new(0.1, 0.2),
            end_position: None,
            outcome: Outcome::Failed,
            confidence: 0.8,
            auto_flag: AutoFlag::Bad,
            owner: "coach".to_owned(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "shot");
        assert_eq!(json["autoFlag"], "bad");
        assert_eq!(json["playerId"], serde_json::Value::Null);
    }
}
