//! egui rendering. Views draw a [`crate::coordinator::ViewOutput`] and hand
//! user gestures back as [`crate::state::Event`]s; they never touch state.

pub mod panels;
pub mod plot;
pub mod table;
