// Metrics placeholders for the booking service.
// If a metrics infrastructure exists later, swap these no-ops with real counters/histograms.

#[macro_export]
macro_rules! booking_counter_inc {
    ($name:expr $(, $key:expr => $val:expr )* $(,)?) => {
        // no-op placeholder
        let _ = ($name $(, $key, $val )*);
    };
}

#[macro_export]
macro_rules! booking_histogram_observe_ms {
    ($name:expr, $ms:expr $(, $key:expr => $val:expr )* $(,)?) => {
        // no-op placeholder
        let _ = ($name, $ms $(, $key, $val )*);
    };
}
