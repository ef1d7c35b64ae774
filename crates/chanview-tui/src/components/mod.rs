pub mod channel_list;
