pub mod phase_monitor;
