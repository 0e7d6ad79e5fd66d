mod common;

mod chat;
mod disconnect;
mod game_lifecycle;
mod ko;
mod lobby;
mod moves;
mod pass;
mod presence;
mod presentation;
mod rematch;
mod resign;
mod smoke;
mod territory;
mod undo;
