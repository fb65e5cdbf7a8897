//! Tests for competitor aggregate (bridge, tick order, timers).

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::body::EffortKind;
    use crate::competitor::{competitor_seed, Competitor, FALL_REASON};
    use crate::config::CompetitorConfig;
    use crate::locomotion::LocomotionState;
    use crate::notifications::{CompetitorId, EventKind, NotificationBus, NotificationOutbox, RaceEvent};
    use crate::terrain::TerrainKind;

    const DT: f32 = 0.1;

    fn competitor_with_outbox(id: u32) -> (Competitor, NotificationBus, NotificationOutbox) {
        let bus = NotificationBus::new();
        let outbox = NotificationOutbox::new();
        outbox.attach(&bus);
        let competitor = Competitor::new(CompetitorId(id), &CompetitorConfig::default(), 42, bus.clone())
            .expect("default config is valid");
        (competitor, bus, outbox)
    }

    #[test]
    fn test_fall_bridge_crashes_riding_competitor() {
        let (mut competitor, _bus, outbox) = competitor_with_outbox(1);
        competitor.stability_mut().force_value(96.0);

        // speed 0 на асфальте: только возврат к центру (96 → 95.0) и fall check
        competitor.update(DT, Some(TerrainKind::Asphalt), 0.0);

        assert!(competitor.stability().is_falling());
        assert_eq!(competitor.state(), LocomotionState::Crashed);

        let machine = competitor.locomotion().lock();
        let transition = machine.last_transition().expect("crash recorded");
        assert_eq!(transition.from, LocomotionState::Riding);
        assert_eq!(transition.reason.as_deref(), Some(FALL_REASON));
        drop(machine);

        let kinds = outbox.drain_kinds();
        let falling = kinds.iter().position(|k| *k == EventKind::StabilityFalling);
        let changed = kinds.iter().position(|k| *k == EventKind::LocomotionStateChanged);
        assert!(falling.is_some() && changed.is_some());
        assert!(falling < changed, "bridge runs inline after falling: {:?}", kinds);
    }

    #[test]
    fn test_crash_request_fails_when_already_crashed() {
        let (mut competitor, _bus, _outbox) = competitor_with_outbox(1);

        assert!(competitor.request_state(LocomotionState::Crashed, Some(FALL_REASON)));
        assert!(!competitor.request_state(LocomotionState::Crashed, Some(FALL_REASON)));

        // Bridge на уже CRASHED участнике ничего не пишет в history
        competitor.stability_mut().force_value(-99.0);
        competitor.update(DT, None, 0.0);
        assert_eq!(competitor.locomotion().lock().history_len(), 1);
    }

    #[test]
    fn test_bridge_ignores_other_competitors() {
        let bus = NotificationBus::new();
        let config = CompetitorConfig::default();
        let mut first = Competitor::new(CompetitorId(1), &config, 7, bus.clone()).expect("valid");
        let second = Competitor::new(CompetitorId(2), &config, 7, bus.clone()).expect("valid");

        first.stability_mut().force_value(100.0);
        first.update(DT, None, 0.0);

        assert_eq!(first.state(), LocomotionState::Crashed);
        assert_eq!(second.state(), LocomotionState::Riding);
    }

    #[test]
    fn test_crash_recovery_resets_stability_and_returns_to_riding() {
        let (mut competitor, _bus, outbox) = competitor_with_outbox(3);
        competitor.stability_mut().force_value(97.0);
        competitor.update(DT, None, 0.0);
        assert_eq!(competitor.state(), LocomotionState::Crashed);
        outbox.drain();

        // 2.0s crash recovery
        let mut automatic = Vec::new();
        for _ in 0..25 {
            if let Some(transition) = competitor.update(DT, None, 0.0) {
                automatic.push((transition.from, transition.to));
            }
        }
        assert_eq!(automatic, vec![(LocomotionState::Crashed, LocomotionState::Remounting)]);
        assert!(!competitor.stability().is_falling());
        assert_eq!(competitor.stability().current(), 0.0);

        // 1.0s remount
        for _ in 0..12 {
            if let Some(transition) = competitor.update(DT, None, 0.0) {
                automatic.push((transition.from, transition.to));
            }
        }
        assert_eq!(competitor.state(), LocomotionState::Riding);
        assert_eq!(automatic.last(), Some(&(LocomotionState::Remounting, LocomotionState::Riding)));

        let recovered = outbox
            .drain_events()
            .into_iter()
            .filter(|event| *event == RaceEvent::StabilityRecovered)
            .count();
        assert!(recovered >= 1);
    }

    #[test]
    fn test_effort_drains_while_riding() {
        let (mut competitor, _bus, _outbox) = competitor_with_outbox(1);

        for _ in 0..20 {
            competitor.hold_effort(EffortKind::Accelerate);
            competitor.update(DT, None, 20.0);
        }

        // 2.0s × 8/s, без покрытия множитель 1.0
        assert!((competitor.stamina().current() - 84.0).abs() < 1e-3);
        assert!((competitor.stamina().fatigue() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_terrain_scales_effort_drain() {
        let (mut on_concrete, _bus, _outbox) = competitor_with_outbox(1);
        let (mut in_sand, _bus2, _outbox2) = competitor_with_outbox(2);

        // Медленно: policy не раскачивает, но и отдыха нет (rest threshold 5)
        on_concrete.hold_effort(EffortKind::Accelerate);
        on_concrete.update(1.0, Some(TerrainKind::Concrete), 8.0);
        in_sand.hold_effort(EffortKind::Accelerate);
        in_sand.update(1.0, Some(TerrainKind::Sand), 8.0);

        assert!((on_concrete.stamina().current() - 94.4).abs() < 1e-4);
        assert!((in_sand.stamina().current() - 85.6).abs() < 1e-4);
    }

    #[test]
    fn test_low_stamina_rider_shaken_harder() {
        let (mut fresh, _bus, fresh_outbox) = competitor_with_outbox(1);
        let (mut tired, _bus2, tired_outbox) = competitor_with_outbox(2);
        tired.drain_for_effort(EffortKind::Sprint, 5.0);
        assert!(tired.stamina().is_exhausted());

        for _ in 0..5 {
            fresh.update(1.0 / 60.0, Some(TerrainKind::Mud), 15.0);
            tired.update(1.0 / 60.0, Some(TerrainKind::Mud), 15.0);
        }

        let magnitude = |outbox: &NotificationOutbox| {
            outbox.drain_events().into_iter().find_map(|event| match event {
                RaceEvent::StabilityPerturbed { perturbation } => Some(perturbation.magnitude),
                _ => None,
            })
        };
        assert_eq!(magnitude(&fresh_outbox), Some(30.0));
        let tired_magnitude = magnitude(&tired_outbox).expect("tired rider perturbed");
        assert!((tired_magnitude - 54.0).abs() < 1e-3);
    }

    #[test]
    fn test_fall_while_carrying_ends_excursion() {
        let (mut competitor, _bus, outbox) = competitor_with_outbox(1);
        assert!(competitor.request_state(LocomotionState::Carrying, Some("barrier")));

        // CARRYING → CRASHED запрещён: bridge отказывает, excursion закрывается
        competitor.stability_mut().force_value(96.0);
        competitor.update(DT, None, 0.0);
        assert_eq!(competitor.state(), LocomotionState::Carrying);
        assert!(!competitor.stability().is_falling());
        assert_eq!(competitor.stability().current(), 0.0);

        assert!(competitor.request_state(LocomotionState::Remounting, None));
        for _ in 0..12 {
            competitor.update(DT, None, 0.0);
        }
        assert_eq!(competitor.state(), LocomotionState::Riding);

        // Следующий выход за порог снова роняет
        competitor.stability_mut().force_value(-99.0);
        competitor.update(DT, None, 0.0);
        assert_eq!(competitor.state(), LocomotionState::Crashed);

        let falling = outbox
            .drain_kinds()
            .into_iter()
            .filter(|kind| *kind == EventKind::StabilityFalling)
            .count();
        assert_eq!(falling, 2);
    }

    #[test]
    fn test_state_listener_reads_competitor_locomotion() {
        let (mut competitor, bus, _outbox) = competitor_with_outbox(1);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let handle = competitor.locomotion().clone();
        let seen_slot = Arc::clone(&seen);
        bus.subscribe(EventKind::LocomotionStateChanged, move |_| {
            seen_slot.lock().unwrap().push((handle.state(), handle.lock().profile().accepts_input));
            Ok(())
        });

        // Command layer
        assert!(competitor.request_state(LocomotionState::Carrying, None));
        assert!(competitor.request_state(LocomotionState::Remounting, None));
        for _ in 0..12 {
            competitor.update(DT, None, 0.0);
        }

        // Bridge
        competitor.stability_mut().force_value(97.0);
        competitor.update(DT, None, 0.0);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (LocomotionState::Carrying, true),
                (LocomotionState::Remounting, false),
                (LocomotionState::Riding, true),
                (LocomotionState::Crashed, false),
            ]
        );
    }

    #[test]
    fn test_effort_ignored_while_crashed() {
        let (mut competitor, _bus, _outbox) = competitor_with_outbox(1);
        assert!(competitor.request_state(LocomotionState::Crashed, None));

        competitor.hold_effort(EffortKind::Sprint);
        competitor.update(DT, None, 0.0);

        assert_eq!(competitor.stamina().current(), 100.0);
        assert!(!competitor.activate_sprint());
    }

    #[test]
    fn test_stamina_recovers_when_resting_or_carrying() {
        let (mut competitor, _bus, _outbox) = competitor_with_outbox(1);
        competitor.drain_for_effort(EffortKind::Sprint, 2.0);
        assert_eq!(competitor.stamina().current(), 60.0);

        // Быстро и без усилия — не отдых
        competitor.update(1.0, Some(TerrainKind::Asphalt), 20.0);
        assert_eq!(competitor.stamina().current(), 60.0);

        // Стоит — восстанавливается 8/s, fatigue 1.0 от спринта срезает 0.3%
        competitor.update(1.0, Some(TerrainKind::Asphalt), 0.0);
        assert!((competitor.stamina().current() - 67.976).abs() < 1e-3);
        assert_eq!(competitor.stamina().fatigue(), 0.0);

        // Несёт велосипед бегом — тоже восстанавливается
        assert!(competitor.request_state(LocomotionState::Carrying, Some("barrier")));
        competitor.update(1.0, Some(TerrainKind::Asphalt), 8.0);
        assert!((competitor.stamina().current() - 75.976).abs() < 1e-3);
    }

    #[test]
    fn test_held_effort_lasts_one_tick() {
        let (mut competitor, _bus, _outbox) = competitor_with_outbox(1);

        competitor.hold_effort(EffortKind::Accelerate);
        competitor.update(1.0, None, 20.0);
        competitor.update(1.0, None, 20.0);

        assert_eq!(competitor.stamina().current(), 92.0);
    }

    #[test]
    fn test_rough_terrain_perturbs_moving_competitor() {
        let (mut competitor, _bus, outbox) = competitor_with_outbox(1);

        for _ in 0..5 {
            competitor.update(1.0 / 60.0, Some(TerrainKind::Mud), 15.0);
        }

        let perturbed = outbox
            .drain_kinds()
            .into_iter()
            .filter(|kind| *kind == EventKind::StabilityPerturbed)
            .count();
        assert_eq!(perturbed, 1);
        assert_eq!(competitor.stability().current().abs(), 30.0);
    }

    #[test]
    fn test_speed_factor_combines_zone_and_profile() {
        let (mut competitor, _bus, _outbox) = competitor_with_outbox(1);
        assert_eq!(competitor.speed_factor(), 1.0);

        competitor.drain_for_effort(EffortKind::Sprint, 3.0); // 100 → 40, YELLOW
        assert!(competitor.request_state(LocomotionState::Carrying, None));
        assert!((competitor.speed_factor() - 0.8 * 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = CompetitorConfig::default();
        config.stamina.max = 0.0;

        let result = Competitor::new(CompetitorId(1), &config, 1, NotificationBus::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_drop_unsubscribes_bridge() {
        let bus = NotificationBus::new();
        let competitor = Competitor::new(CompetitorId(1), &CompetitorConfig::default(), 1, bus.clone())
            .expect("valid");
        assert_eq!(bus.listener_count(EventKind::StabilityFalling), 1);

        drop(competitor);
        assert_eq!(bus.listener_count(EventKind::StabilityFalling), 0);
    }

    #[test]
    fn test_seed_differs_per_competitor() {
        assert_ne!(competitor_seed(42, CompetitorId(1)), competitor_seed(42, CompetitorId(2)));
        assert_eq!(competitor_seed(42, CompetitorId(1)), competitor_seed(42, CompetitorId(1)));
    }

    #[test]
    fn test_snapshot_serializes() {
        let (competitor, _bus, _outbox) = competitor_with_outbox(5);

        let json = serde_json::to_string(&competitor.snapshot()).expect("serializable");
        assert!(json.contains("\"Riding\""));
    }
}
