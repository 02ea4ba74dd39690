pub mod cli;
pub mod comments;
pub mod config;
pub mod git;
pub mod logging;
pub mod markup;
pub mod script;
pub mod session;
pub mod table;
