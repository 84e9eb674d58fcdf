pub mod test_relay_over_ws;
