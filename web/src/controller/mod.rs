pub(crate) mod health_check_controller;
pub(crate) mod test_sse_controller;
