pub mod notification_service;
pub mod ratio_service;
pub mod report_service;
