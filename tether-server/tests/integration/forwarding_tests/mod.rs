mod test_connect_unknown_peer;
