pub mod balance_entry;
pub mod cold_room;
pub mod cold_room_box;
pub mod counting_record;
pub mod pallet;
