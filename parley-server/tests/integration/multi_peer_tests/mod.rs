mod test_concurrent_membership;
