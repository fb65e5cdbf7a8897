//! Tests for stamina resource.

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use crate::body::{EffortKind, StaminaConfig, StaminaResource, StaminaZone};
    use crate::notifications::{CompetitorId, EventKind, NotificationBus, NotificationOutbox, RaceEvent};

    fn stamina_with_outbox() -> (StaminaResource, NotificationOutbox) {
        let bus = NotificationBus::new();
        let outbox = NotificationOutbox::new();
        outbox.attach(&bus);
        let stamina = StaminaResource::new(&StaminaConfig::default(), CompetitorId(1), bus);
        (stamina, outbox)
    }

    #[test]
    fn test_accelerate_two_seconds_drains_sixteen() {
        let (mut stamina, _outbox) = stamina_with_outbox();

        stamina.drain_for_effort(EffortKind::Accelerate, 2.0);

        // 100 - 8 * 2 = 84
        assert_eq!(stamina.current(), 84.0);
        assert_eq!(stamina.zone(), StaminaZone::Green);
        assert_eq!(stamina.drain_rate(), 8.0);
        assert!(!stamina.is_exhausted());
    }

    #[test]
    fn test_zone_change_publishes_after_changed() {
        let (mut stamina, outbox) = stamina_with_outbox();

        stamina.drain(45.0);

        assert_eq!(
            outbox.drain_events(),
            vec![
                RaceEvent::StaminaChanged { current: 55.0, max: 100.0 },
                RaceEvent::StaminaZoneChanged {
                    previous: StaminaZone::Green,
                    zone: StaminaZone::Yellow,
                },
            ]
        );
        assert_eq!(stamina.speed_multiplier(), 0.8);
    }

    #[test]
    fn test_drain_without_change_is_silent() {
        let (mut stamina, outbox) = stamina_with_outbox();

        stamina.drain(-10.0);
        stamina.drain(0.0);

        assert_eq!(stamina.current(), 100.0);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_exhausted_published_once_on_falling_edge() {
        let (mut stamina, outbox) = stamina_with_outbox();

        stamina.drain(150.0);
        stamina.drain(10.0);

        assert_eq!(stamina.current(), 0.0);
        assert!(stamina.is_exhausted());
        let exhausted = outbox
            .drain_kinds()
            .into_iter()
            .filter(|kind| *kind == EventKind::StaminaExhausted)
            .count();
        assert_eq!(exhausted, 1);
        assert_eq!(stamina.zone(), StaminaZone::Red);
        assert_eq!(stamina.speed_multiplier(), 0.5);
    }

    #[test]
    fn test_effort_is_noop_when_exhausted() {
        let (mut stamina, outbox) = stamina_with_outbox();
        stamina.drain(100.0);
        outbox.drain();

        stamina.drain_for_effort(EffortKind::Sprint, 1.0);

        assert!(outbox.is_empty());
        assert_eq!(stamina.current(), 0.0);
    }

    #[test]
    fn test_exhaustion_clears_silently_on_recovery() {
        let (mut stamina, outbox) = stamina_with_outbox();
        stamina.drain(100.0);
        outbox.drain();

        stamina.recover(1.0);

        assert!(!stamina.is_exhausted());
        assert_eq!(stamina.current(), 8.0);
        assert_eq!(
            outbox.drain_kinds(),
            vec![EventKind::StaminaRecoveryStarted, EventKind::StaminaChanged]
        );
    }

    #[test]
    fn test_recovery_started_and_completed_once() {
        let (mut stamina, outbox) = stamina_with_outbox();
        stamina.drain(10.0);
        outbox.drain();

        stamina.recover(1.0);
        assert!(stamina.is_recovering());
        assert_eq!(
            outbox.drain_kinds(),
            vec![EventKind::StaminaRecoveryStarted, EventKind::StaminaChanged]
        );

        stamina.recover(1.0);
        assert_eq!(stamina.current(), 100.0);
        assert!(!stamina.is_recovering());
        assert_eq!(
            outbox.drain_kinds(),
            vec![EventKind::StaminaChanged, EventKind::StaminaRecoveryCompleted]
        );

        // Уже на max — ничего
        stamina.recover(1.0);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_drain_interrupts_recovery() {
        let (mut stamina, outbox) = stamina_with_outbox();
        stamina.drain(50.0);
        stamina.recover(0.5);
        assert!(stamina.is_recovering());

        stamina.drain(5.0);
        assert!(!stamina.is_recovering());
        outbox.drain();

        stamina.recover(0.5);
        assert_eq!(outbox.drain_kinds()[0], EventKind::StaminaRecoveryStarted);
    }

    #[test]
    fn test_sprint_activation() {
        let (mut stamina, _outbox) = stamina_with_outbox();

        assert!(stamina.can_sprint());
        assert!(stamina.activate_sprint());
        assert_eq!(stamina.current(), 80.0);

        stamina.drain(65.0); // 15 < activation cost 20
        assert!(!stamina.can_sprint());
    }

    #[test]
    fn test_failed_sprint_has_no_side_effects() {
        let (mut stamina, outbox) = stamina_with_outbox();
        stamina.drain(90.0);
        outbox.drain();

        assert!(!stamina.activate_sprint());
        assert!(!stamina.activate_sprint());

        assert_eq!(stamina.current(), 10.0);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_zone_thresholds() {
        assert_eq!(StaminaZone::from_ratio(1.0), StaminaZone::Green);
        assert_eq!(StaminaZone::from_ratio(0.6), StaminaZone::Green);
        assert_eq!(StaminaZone::from_ratio(0.59), StaminaZone::Yellow);
        assert_eq!(StaminaZone::from_ratio(0.3), StaminaZone::Yellow);
        assert_eq!(StaminaZone::from_ratio(0.29), StaminaZone::Red);
        assert_eq!(StaminaZone::from_ratio(0.0), StaminaZone::Red);
    }

    #[test]
    fn test_zone_query_is_stable_without_mutation() {
        let (mut stamina, _outbox) = stamina_with_outbox();
        stamina.drain(42.0);

        let first = stamina.zone();
        for _ in 0..10 {
            assert_eq!(stamina.zone(), first);
        }
    }

    #[test]
    fn test_random_sequences_keep_bounds() {
        let (mut stamina, _outbox) = stamina_with_outbox();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..2_000 {
            match rng.gen_range(0..4) {
                0 => stamina.drain(rng.gen_range(-20.0..60.0)),
                1 => stamina.recover(rng.gen_range(-1.0..5.0)),
                2 => stamina.drain_for_effort(EffortKind::Sprint, rng.gen_range(0.0..2.0)),
                _ => {
                    stamina.activate_sprint();
                }
            }

            assert!(stamina.current() >= 0.0 && stamina.current() <= stamina.max());
            assert_eq!(stamina.is_exhausted(), stamina.current() == 0.0);
        }
    }

    #[test]
    fn test_effort_accumulates_fatigue() {
        let (mut stamina, _outbox) = stamina_with_outbox();
        assert_eq!(stamina.fatigue(), 0.0);

        stamina.drain_for_effort(EffortKind::Sprint, 4.0);
        assert_eq!(stamina.fatigue(), 2.0);

        // Простой drain (удар, активация спринта) fatigue не копит
        stamina.drain(5.0);
        assert_eq!(stamina.fatigue(), 2.0);

        stamina.apply_fatigue(500.0);
        assert_eq!(stamina.fatigue(), 100.0);
        assert_eq!(stamina.fatigue_percentage(), 100.0);
        assert_eq!(stamina.snapshot().fatigue, 100.0);
    }

    #[test]
    fn test_fatigue_slows_recovery_and_fades_at_rest() {
        let (mut stamina, _outbox) = stamina_with_outbox();
        stamina.drain(50.0);
        stamina.apply_fatigue(100.0);

        // Полная fatigue: 8/s × 0.7
        stamina.recover(1.0);
        assert!((stamina.current() - 55.6).abs() < 1e-4, "current = {}", stamina.current());
        assert_eq!(stamina.fatigue(), 98.0);

        // Уже на max: stamina не растёт, fatigue всё равно уходит
        let (mut rested, _outbox) = stamina_with_outbox();
        rested.apply_fatigue(10.0);
        rested.recover(3.0);
        assert_eq!(rested.current(), 100.0);
        assert_eq!(rested.fatigue(), 4.0);
    }

    #[test]
    fn test_scaled_effort_drain() {
        let (mut stamina, _outbox) = stamina_with_outbox();

        stamina.drain_for_effort_scaled(EffortKind::Accelerate, 2.0, 2.0);
        assert_eq!(stamina.current(), 68.0);
        assert_eq!(stamina.drain_rate(), 16.0);

        // Некорректный множитель: базовый rate
        stamina.drain_for_effort_scaled(EffortKind::Accelerate, 1.0, f32::NAN);
        assert_eq!(stamina.current(), 60.0);
    }

    #[test]
    fn test_config_validation() {
        assert!(StaminaConfig::default().validate().is_ok());

        let config = StaminaConfig { max: 0.0, ..StaminaConfig::default() };
        assert!(config.validate().is_err());

        let config = StaminaConfig { sprint_activation_cost: 150.0, ..StaminaConfig::default() };
        assert!(config.validate().is_err());

        let config = StaminaConfig { fatigue_recovery_penalty: 1.5, ..StaminaConfig::default() };
        assert!(config.validate().is_err());
    }
}
