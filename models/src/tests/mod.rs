mod platform;
mod server_info;
