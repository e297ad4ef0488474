//! Embassy tasks of the mower firmware
pub mod alarm;
pub mod charger_detect;
pub mod control_loop;
pub mod drive;
pub mod imu_read;
pub mod perimeter_read;
pub mod rc_control;
