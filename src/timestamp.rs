/// Formats a millisecond count as `HH:MM:SS.mmm`.
pub fn time_str(ms: u32) -> String {
    let ms = ms as u64;
    let hours = ms / 3_600_000;
    let minutes = ms / 60_000 % 60;
    let seconds = ms / 1000 % 60;
    let milliseconds = ms % 1000;

    format!(
        "{hours:0width$}:{minutes:02}:{seconds:02}.{milliseconds:03}",
        width = if hours >= 100 { 0 } else { 2 }
    )
}

#[test]
fn duration_formatting() {
    assert_eq!(time_str(0), "00:00:00.000");
    assert_eq!(time_str(26122), "00:00:26.122");
    assert_eq!(time_str(3_723_004), "01:02:03.004");
    assert_eq!(time_str(360_000_000), "100:00:00.000");
}
