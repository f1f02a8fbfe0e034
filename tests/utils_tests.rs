use dropzone::utils::format_file_size;

#[test]
fn test_format_file_size() {
    assert_eq!(format_file_size(0), "0 Bytes");
    assert_eq!(format_file_size(1), "1 Bytes");
    assert_eq!(format_file_size(1023), "1023 Bytes");

    // trailing zeros are dropped
    assert_eq!(format_file_size(1024), "1 KB");
    assert_eq!(format_file_size(1536), "1.5 KB");
    assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");

    // two decimals at most
    assert_eq!(format_file_size(1_234_567), "1.18 MB");

    // gb is the largest unit
    assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
    assert_eq!(format_file_size(2048 * 1024 * 1024 * 1024), "2048 GB");
}
