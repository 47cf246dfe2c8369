mod apply_stream_test;
mod replica_group_test;
