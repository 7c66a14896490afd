pub mod balance;
pub mod loading;
pub mod pallets;
pub mod size_groups;
