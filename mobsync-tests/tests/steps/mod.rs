mod roster_steps;
mod session_steps;
mod timer_steps;
