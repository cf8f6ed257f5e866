pub mod bucket;
pub mod classify;
pub mod collapse;
pub mod cursor;
pub mod item;
pub mod move_date;
