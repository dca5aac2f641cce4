// SPDX-License-Identifier: MIT

//! Test scenarios for rule configurations
//!
//! A scenario holds test paths. Each path is a list of steps that change
//! concepts, plus the visibility expected of tabs, sections, orders and
//! criteria after every step. The runner replays a path on a private copy
//! of the concept state and reports where expectations were not met.

mod book;
pub mod hierarchy;
mod runner;
mod types;

pub use book::{ScenarioBook, MAX_GENERATED_CONCEPTS, MAX_RECORDED_RESULTS};
pub use hierarchy::{active_concepts, find_by_id, group_by_category};
pub use runner::{failure_reason_for, ScenarioRunner};
pub use types::{
    ConceptChange, ExpectedResult, ExpectedResultOutcome, TestPath, TestResult, TestScenario,
    TestStep, TestStepResult, TestSubScenario,
};
