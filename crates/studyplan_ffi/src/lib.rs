//! Flutter bridge surface for the study planner core.

pub mod api;
