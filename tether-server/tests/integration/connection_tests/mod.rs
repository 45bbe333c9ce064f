mod test_stale_disconnect_ignored;
