pub mod pass_commands;
