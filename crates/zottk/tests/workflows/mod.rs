use super::*;

mod local_export;
mod remote_api;
