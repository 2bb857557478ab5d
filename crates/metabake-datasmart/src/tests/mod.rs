
mod update_data;
