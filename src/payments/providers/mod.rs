pub mod viva;
