//! Race session resources: шина, seed, классификатор трассы

use bevy::prelude::*;

use super::aggregate::Competitor;
use crate::config::{CompetitorConfig, ConfigError};
use crate::locomotion::LocomotionState;
use crate::notifications::{CompetitorId, NotificationBus, NotificationOutbox};
use crate::terrain::{TerrainClassifier, TerrainKind};

/// Одна гонка = одна шина + один seed
///
/// Outbox подписан на все события шины; `forward_competitor_notifications`
/// перекладывает их в ECS events.
#[derive(Resource, Debug)]
pub struct RaceSession {
    bus: NotificationBus,
    outbox: NotificationOutbox,
    seed: u64,
    next_id: u32,
}

impl RaceSession {
    pub fn new(seed: u64) -> Self {
        let bus = NotificationBus::new();
        let outbox = NotificationOutbox::new();
        outbox.attach(&bus);
        Self {
            bus,
            outbox,
            seed,
            next_id: 1,
        }
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn outbox(&self) -> &NotificationOutbox {
        &self.outbox
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Новый участник со следующим id (id не переиспользуются)
    pub fn create_competitor(&mut self, config: &CompetitorConfig) -> Result<Competitor, ConfigError> {
        self.create_competitor_in(config, LocomotionState::default())
    }

    pub fn create_competitor_in(
        &mut self,
        config: &CompetitorConfig,
        initial: LocomotionState,
    ) -> Result<Competitor, ConfigError> {
        let competitor = Competitor::with_state(
            CompetitorId(self.next_id),
            config,
            self.seed,
            self.bus.clone(),
            initial,
        )?;
        self.next_id += 1;
        Ok(competitor)
    }
}

impl Default for RaceSession {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Классификатор покрытия трассы (tile map хоста)
#[derive(Resource)]
pub struct TrackTerrain(pub Box<dyn TerrainClassifier>);

impl TrackTerrain {
    pub fn new(classifier: impl TerrainClassifier + 'static) -> Self {
        Self(Box::new(classifier))
    }

    pub fn classify(&self, position: Vec2) -> Option<TerrainKind> {
        self.0.classify(position)
    }
}
