pub mod analysis;
pub mod build_tool;
pub mod codegen;
pub mod config;
pub mod git;
pub mod improvement;
pub mod mutants;
pub mod operators;
pub mod orchestrator;
pub mod output;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod report;
pub mod runner;
