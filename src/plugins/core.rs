use bevy::prelude::*;

use std::time::Duration;

pub struct CorePlugin;

#[derive(Resource, Debug, Clone)]
pub struct SimConfig {
    pub tick_hz: f32,
    pub paused: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_hz: 30.0,
            paused: false,
        }
    }
}

impl SimConfig {
    /// Clamp the tick rate to 1..=120 Hz and re-derive the fixed timestep.
    pub fn set_tick_hz(&mut self, tick_hz: f32, fixed_time: &mut Time<Fixed>) {
        self.tick_hz = tick_hz.clamp(1.0, 120.0);
        *fixed_time = fixed_time_from_config(self);
        info!("Docking tick rate: {} Hz", self.tick_hz);
    }
}

#[derive(Resource, Debug, Default)]
pub struct SimTickCount {
    pub tick: u64,
}

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        let config = SimConfig::default();
        let fixed_time = fixed_time_from_config(&config);

        app.insert_resource(config)
            .insert_resource(fixed_time)
            .init_resource::<SimTickCount>()
            .add_systems(FixedUpdate, tick_simulation.run_if(sim_not_paused));
    }
}

// =============================================================================
// Run Conditions
// =============================================================================

pub fn sim_not_paused(config: Res<SimConfig>) -> bool {
    !config.paused
}

// =============================================================================
// Systems
// =============================================================================

fn tick_simulation(mut counter: ResMut<SimTickCount>) {
    counter.tick = counter.tick.saturating_add(1);

    if counter.tick.is_multiple_of(300) {
        debug!("Sim tick {}", counter.tick);
    }
}

pub fn fixed_time_from_config(config: &SimConfig) -> Time<Fixed> {
    let tick_hz = if config.tick_hz <= 0.0 {
        30.0
    } else {
        config.tick_hz
    };
    let seconds = 1.0 / tick_hz;
    Time::<Fixed>::from_duration(Duration::from_secs_f32(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::SystemState;

    #[test]
    fn sim_config_default_values() {
        let config = SimConfig::default();
        assert_eq!(config.tick_hz, 30.0);
        assert!(!config.paused);
    }

    #[test]
    fn fixed_time_from_config_falls_back_on_non_positive_tick_rate() {
        let config = SimConfig {
            tick_hz: 0.0,
            paused: false,
        };
        let fixed = fixed_time_from_config(&config);
        assert!((fixed.timestep().as_secs_f32() - 1.0 / 30.0).abs() < 1e-6);
    }

    #[test]
    fn set_tick_hz_clamps_and_updates_fixed_time() {
        let mut config = SimConfig::default();
        let mut fixed = fixed_time_from_config(&config);

        config.set_tick_hz(0.5, &mut fixed);
        assert_eq!(config.tick_hz, 1.0);
        assert_eq!(fixed.timestep().as_secs_f32(), 1.0);

        config.set_tick_hz(500.0, &mut fixed);
        assert_eq!(config.tick_hz, 120.0);
    }

    #[test]
    fn paused_config_blocks_run_condition() {
        let mut world = World::default();
        world.insert_resource(SimConfig {
            tick_hz: 30.0,
            paused: true,
        });

        let mut system_state: SystemState<Res<SimConfig>> = SystemState::new(&mut world);
        let config = system_state.get(&world);
        assert!(!sim_not_paused(config));
    }

    #[test]
    fn tick_simulation_counts_ticks() {
        let mut world = World::default();
        world.insert_resource(SimTickCount::default());

        let mut system_state: SystemState<ResMut<SimTickCount>> = SystemState::new(&mut world);
        for _ in 0..3 {
            let counter = system_state.get_mut(&mut world);
            tick_simulation(counter);
        }
        system_state.apply(&mut world);

        assert_eq!(world.resource::<SimTickCount>().tick, 3);
    }
}
