use meter_client::Reading;

/// Order-sensitive blake3 digest over loaded readings.
///
/// Two loads yield the same fingerprint only if they produced the same rows in
/// the same order.
pub struct DatasetFingerprint {
    hasher: blake3::Hasher,
    rows: u64,
}

impl DatasetFingerprint {
    pub fn new() -> Self {
        Self {
            hasher: blake3::Hasher::new(),
            rows: 0,
        }
    }

    pub fn update(&mut self, r: &Reading) {
        self.hasher.update(&r.meter_id.to_le_bytes());
        self.hasher.update(&r.timestamp.unix_timestamp_nanos().to_le_bytes());
        self.hasher.update(&r.value_kwh.to_bits().to_le_bytes());
        self.rows += 1;
    }

    pub fn finalize(mut self) -> String {
        self.hasher.update(&self.rows.to_le_bytes());
        self.hasher.finalize().to_hex().to_string()
    }
}

impl Default for DatasetFingerprint {
    fn default() -> Self {
        Self::new()
    }
}
