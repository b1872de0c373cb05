pub(crate) mod test_sse;
