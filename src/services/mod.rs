pub mod notice_board;
pub mod notice_log;
pub mod notification;
