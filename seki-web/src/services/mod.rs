pub mod clock;
pub mod clock_sweep;
pub mod engine_builder;
pub mod game_actions;
pub mod game_creator;
pub mod live;
pub mod state_serializer;
