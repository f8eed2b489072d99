//! War ledger - the authoritative record of wars and their score
//!
//! Score follows the attacker-positive convention: positive values favour
//! the attacking faction, negative values the defender. The stored score is
//! unbounded; peace negotiation only counts it up to the configured cap.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::config::WarConfig;
use crate::core::error::{Result, WarfareError};
use crate::core::types::{BattleId, FactionId, IdAllocator, SiegeId, Side, TerritoryId, Turn, WarId};

/// What the attacker declared war to obtain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarGoal {
    Conquest,
    Vassalize,
    Tribute,
    Humiliate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarStatus {
    /// Declared, no score posted yet
    Declared,
    Active,
    Concluded,
}

/// Terms offered in a peace proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PeaceTerms {
    WhitePeace,
    /// Territories handed from the losing side to the victor
    Cede(Vec<TerritoryId>),
    Vassalize,
    Tribute,
    Humiliate,
}

/// How a war ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeaceSettlement {
    /// `None` for a white peace
    pub victor: Option<Side>,
    pub terms: PeaceTerms,
    pub turn: Turn,
    pub final_score: f32,
    /// Forced by the score reaching the capitulation threshold
    pub capitulation: bool,
}

/// What produced a score change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreSource {
    Battle(BattleId),
    Siege(SiegeId),
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub turn: Turn,
    pub source: ScoreSource,
    pub side: Side,
    /// Magnitude credited to `side`
    pub delta: f32,
}

/// A war between two factions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct War {
    pub id: WarId,
    pub attacker: FactionId,
    pub defender: FactionId,
    pub goal: WarGoal,
    /// Territories the attacker claims; ceded on capitulation in a conquest
    pub claims: Vec<TerritoryId>,
    pub declared_turn: Turn,
    pub score: f32,
    pub contributions: Vec<ScoreEntry>,
    pub status: WarStatus,
    pub settlement: Option<PeaceSettlement>,
}

impl War {
    pub fn is_active(&self) -> bool {
        self.status != WarStatus::Concluded
    }

    pub fn involves(&self, faction: FactionId) -> bool {
        self.attacker == faction || self.defender == faction
    }

    /// Which side a faction fights on
    pub fn side_of(&self, faction: FactionId) -> Option<Side> {
        if faction == self.attacker {
            Some(Side::Attacker)
        } else if faction == self.defender {
            Some(Side::Defender)
        } else {
            None
        }
    }

    pub fn faction_of(&self, side: Side) -> FactionId {
        match side {
            Side::Attacker => self.attacker,
            Side::Defender => self.defender,
        }
    }

    /// Score seen from one side; positive means that side is winning
    pub fn score_for(&self, side: Side) -> f32 {
        self.score * side.sign()
    }
}

/// Score required to impose `terms`
pub fn required_score(terms: &PeaceTerms, config: &WarConfig) -> f32 {
    let table = &config.peace_terms;
    match terms {
        PeaceTerms::WhitePeace => table.white_peace,
        PeaceTerms::Cede(territories) => table.per_ceded_territory * territories.len() as f32,
        PeaceTerms::Vassalize => table.vassalize,
        PeaceTerms::Tribute => table.tribute,
        PeaceTerms::Humiliate => table.humiliate,
    }
}

/// Result of posting score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreUpdate {
    pub score: f32,
    /// Set when the post pushed the war past the capitulation threshold
    pub capitulation: Option<PeaceSettlement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarLedger {
    wars: BTreeMap<WarId, War>,
    ids: IdAllocator,
    turn: Turn,
}

impl WarLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn stamped on score entries and settlements
    pub fn set_turn(&mut self, turn: Turn) {
        self.turn = turn;
    }

    pub fn declare(&mut self, attacker: FactionId, defender: FactionId, goal: WarGoal) -> Result<WarId> {
        self.declare_with_claims(attacker, defender, goal, Vec::new())
    }

    /// Declare a war naming the territories the attacker wants
    pub fn declare_with_claims(
        &mut self,
        attacker: FactionId,
        defender: FactionId,
        goal: WarGoal,
        mut claims: Vec<TerritoryId>,
    ) -> Result<WarId> {
        if attacker == defender {
            return Err(WarfareError::InvalidOrder(format!(
                "{} cannot declare war on itself",
                attacker
            )));
        }
        if self.active_war_between(attacker, defender).is_some() {
            return Err(WarfareError::AlreadyAtWar { attacker, defender });
        }

        claims.sort();
        claims.dedup();

        let id = WarId(self.ids.next_raw());
        info!(war = %id, %attacker, %defender, ?goal, "war declared");
        self.wars.insert(
            id,
            War {
                id,
                attacker,
                defender,
                goal,
                claims,
                declared_turn: self.turn,
                score: 0.0,
                contributions: Vec::new(),
                status: WarStatus::Declared,
                settlement: None,
            },
        );
        Ok(id)
    }

    pub fn get(&self, id: WarId) -> Option<&War> {
        self.wars.get(&id)
    }

    pub fn war(&self, id: WarId) -> Result<&War> {
        self.wars.get(&id).ok_or(WarfareError::UnknownWar(id))
    }

    pub fn wars(&self) -> impl Iterator<Item = &War> {
        self.wars.values()
    }

    pub fn active_wars(&self) -> impl Iterator<Item = &War> {
        self.wars.values().filter(|w| w.is_active())
    }

    /// Active war between two factions in either orientation
    pub fn active_war_between(&self, a: FactionId, b: FactionId) -> Option<WarId> {
        self.wars
            .values()
            .find(|w| w.is_active() && w.involves(a) && w.involves(b) && a != b)
            .map(|w| w.id)
    }

    pub fn at_war(&self, a: FactionId, b: FactionId) -> bool {
        self.active_war_between(a, b).is_some()
    }

    /// Credit `delta` to `side`
    pub fn post_score(&mut self, war: WarId, side: Side, delta: f32, config: &WarConfig) -> Result<ScoreUpdate> {
        self.post_score_from(war, side, delta, ScoreSource::Manual, config)
    }

    /// Credit `delta` to `side`, recording what produced it
    ///
    /// Reaching the capitulation threshold concludes the war on the spot
    /// with the victor's default terms.
    pub fn post_score_from(
        &mut self,
        war_id: WarId,
        side: Side,
        delta: f32,
        source: ScoreSource,
        config: &WarConfig,
    ) -> Result<ScoreUpdate> {
        let turn = self.turn;
        let threshold = config.capitulation_threshold;
        let war = self
            .wars
            .get_mut(&war_id)
            .ok_or(WarfareError::UnknownWar(war_id))?;
        if !war.is_active() {
            return Err(WarfareError::WarConcluded(war_id));
        }

        war.score += delta * side.sign();
        war.contributions.push(ScoreEntry {
            turn,
            source,
            side,
            delta,
        });
        if war.status == WarStatus::Declared {
            war.status = WarStatus::Active;
        }
        debug!(war = %war_id, ?side, delta, score = war.score, "war score posted");

        let score = war.score;
        let capitulation = if score.abs() >= threshold {
            let victor = if score > 0.0 { Side::Attacker } else { Side::Defender };
            let terms = default_terms(war, victor);
            Some(conclude(war, Some(victor), terms, turn, true))
        } else {
            None
        };

        Ok(ScoreUpdate { score, capitulation })
    }

    /// Settle a war on `proposer`'s terms
    ///
    /// The proposer's score, capped at the configured maximum, must cover
    /// the terms. A white peace only needs a non-negative score, and a
    /// cession must name at least one territory.
    pub fn negotiate_peace(
        &mut self,
        war_id: WarId,
        proposer: Side,
        terms: PeaceTerms,
        config: &WarConfig,
    ) -> Result<PeaceSettlement> {
        if matches!(&terms, PeaceTerms::Cede(territories) if territories.is_empty()) {
            return Err(WarfareError::InvalidOrder(format!(
                "{} cedes no territory",
                war_id
            )));
        }
        let turn = self.turn;
        let need = required_score(&terms, config);
        let cap = config.score_cap;
        let war = self
            .wars
            .get_mut(&war_id)
            .ok_or(WarfareError::UnknownWar(war_id))?;
        if !war.is_active() {
            return Err(WarfareError::WarConcluded(war_id));
        }

        let have = war.score_for(proposer).min(cap);
        if have < need {
            return Err(WarfareError::InsufficientScore { have, need });
        }

        let victor = match terms {
            PeaceTerms::WhitePeace => None,
            _ => Some(proposer),
        };
        Ok(conclude(war, victor, terms, turn, false))
    }

    /// Conclude the war if the score has reached the capitulation threshold
    pub fn force_capitulation(&mut self, war_id: WarId, config: &WarConfig) -> Result<Option<PeaceSettlement>> {
        let turn = self.turn;
        let threshold = config.capitulation_threshold;
        let war = self
            .wars
            .get_mut(&war_id)
            .ok_or(WarfareError::UnknownWar(war_id))?;
        if !war.is_active() {
            return Err(WarfareError::WarConcluded(war_id));
        }
        if war.score.abs() < threshold {
            return Ok(None);
        }
        let victor = if war.score > 0.0 { Side::Attacker } else { Side::Defender };
        let terms = default_terms(war, victor);
        Ok(Some(conclude(war, Some(victor), terms, turn, true)))
    }
}

/// Terms a capitulating side accepts
///
/// A winning attacker gets its war goal; a winning defender humiliates the
/// attacker. Conquest cedes every claim.
pub fn default_terms(war: &War, victor: Side) -> PeaceTerms {
    match victor {
        Side::Defender => PeaceTerms::Humiliate,
        Side::Attacker => match war.goal {
            WarGoal::Conquest => PeaceTerms::Cede(war.claims.clone()),
            WarGoal::Vassalize => PeaceTerms::Vassalize,
            WarGoal::Tribute => PeaceTerms::Tribute,
            WarGoal::Humiliate => PeaceTerms::Humiliate,
        },
    }
}

fn conclude(war: &mut War, victor: Option<Side>, terms: PeaceTerms, turn: Turn, capitulation: bool) -> PeaceSettlement {
    let settlement = PeaceSettlement {
        victor,
        terms,
        turn,
        final_score: war.score,
        capitulation,
    };
    war.status = WarStatus::Concluded;
    war.settlement = Some(settlement.clone());
    info!(war = %war.id, ?victor, score = war.score, capitulation, "war concluded");
    settlement
}
