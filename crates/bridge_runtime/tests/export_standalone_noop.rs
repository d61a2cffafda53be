//! Symbols generated by `export_standalone_noop!`.

bridge_runtime::export_standalone_noop!();

#[test]
fn test_noop_symbols() {
    start_service();
    assert!(get_next_message().is_null());
    free_message(std::ptr::null_mut());
    unsafe { set_message_callback(None) };
    stop_service();
    stop_service();
}
