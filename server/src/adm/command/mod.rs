pub mod add_binary;
pub mod list_binaries;
pub mod show_binary;
pub mod update_binary;
