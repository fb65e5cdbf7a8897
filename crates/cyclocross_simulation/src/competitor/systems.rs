//! Competitor systems (FixedUpdate, chained)

use bevy::prelude::*;

use super::aggregate::Competitor;
use super::components::{MotionLimits, MotionSample, TerrainSample};
use super::events::{CompetitorNotification, EffortIntent, SprintIntent};
use super::session::{RaceSession, TrackTerrain};
use crate::logger::{self, LogLevel};
use crate::terrain::MotionSampler;

/// Система: intents command layer'а → Competitor
pub fn apply_competitor_intents(
    mut efforts: EventReader<EffortIntent>,
    mut sprints: EventReader<SprintIntent>,
    mut competitors: Query<&mut Competitor>,
) {
    for intent in sprints.read() {
        let Ok(mut competitor) = competitors.get_mut(intent.entity) else {
            continue;
        };
        if !competitor.activate_sprint() {
            logger::log(&format!(
                "{:?} sprint rejected (stamina {:.1})",
                competitor.id(),
                competitor.stamina().current()
            ));
        }
    }

    for intent in efforts.read() {
        if let Ok(mut competitor) = competitors.get_mut(intent.entity) {
            competitor.hold_effort(intent.kind);
        }
    }
}

/// Система: тик всех участников
///
/// `log_once` ключи ошибок конфигурации (один на вид, а не на entity)
pub const MISSING_MOTION_SAMPLE_KEY: &str = "competitor.missing_motion_sample";
pub const MISSING_TERRAIN_KEY: &str = "competitor.missing_terrain";

/// Без MotionSample или без источника terrain участник пропускается
/// (ошибка конфигурации, логируется один раз на процесс).
pub fn tick_competitors(
    time: Res<Time<Fixed>>,
    track: Option<Res<TrackTerrain>>,
    mut competitors: Query<(
        Entity,
        &mut Competitor,
        Option<&MotionSample>,
        Option<&TerrainSample>,
    )>,
) {
    let delta = time.delta_secs();

    for (entity, mut competitor, motion, terrain_sample) in competitors.iter_mut() {
        let Some(motion) = motion else {
            logger::log_once(
                MISSING_MOTION_SAMPLE_KEY,
                LogLevel::Error,
                &format!("{:?} ({:?}) has no MotionSample, update skipped", competitor.id(), entity),
            );
            continue;
        };

        let terrain = match (terrain_sample, track.as_deref()) {
            (Some(sample), _) => sample.0,
            (None, Some(track)) => track.classify(motion.position()),
            (None, None) => {
                logger::log_once(
                    MISSING_TERRAIN_KEY,
                    LogLevel::Error,
                    &format!(
                        "{:?} ({:?}) has no TerrainSample and no TrackTerrain resource, update skipped",
                        competitor.id(),
                        entity
                    ),
                );
                continue;
            }
        };

        competitor.update(delta, terrain, motion.current_speed());
    }
}

/// Система: уведомления шины → CompetitorNotification events
pub fn forward_competitor_notifications(
    session: Res<RaceSession>,
    mut writer: EventWriter<CompetitorNotification>,
) {
    for notification in session.outbox().drain() {
        writer.write(CompetitorNotification(notification));
    }
}

/// Система: профиль locomotion + зона stamina → MotionLimits
pub fn sync_motion_limits(
    mut commands: Commands,
    mut competitors: Query<(Entity, &mut Competitor, Option<&mut MotionLimits>)>,
) {
    for (entity, mut competitor, limits) in competitors.iter_mut() {
        let profile = competitor.profile();
        let max_speed_factor = competitor.speed_factor();
        let velocity_scale = competitor.take_velocity_scale();

        match limits {
            Some(mut limits) => {
                limits.max_speed_factor = max_speed_factor;
                limits.accepts_input = profile.accepts_input;
                if velocity_scale.is_some() {
                    limits.pending_velocity_scale = velocity_scale;
                }
            }
            None => {
                commands.entity(entity).insert(MotionLimits {
                    max_speed_factor,
                    accepts_input: profile.accepts_input,
                    pending_velocity_scale: velocity_scale,
                });
            }
        }
    }
}
