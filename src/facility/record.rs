/// Columns of a raw table row after padding or truncation
pub const RAW_COLUMNS: usize = 8;

/// Position of the injected province among the record fields
pub const PROVINCE_INDEX: usize = 6;

/// Field names in output order
pub const FIELD_NAMES: [&str; 9] = [
    "id",
    "facility_name",
    "tel_no",
    "email",
    "street",
    "municipality",
    "province",
    "expire_date",
    "sec",
];

/// One health facility, fields in `FIELD_NAMES` order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record([String; 9]);

impl Record {
    /// Insert `province` between the municipality and expire-date columns of a raw row
    pub fn with_province(row: [String; RAW_COLUMNS], province: &str) -> Self {
        let [id, facility_name, tel_no, email, street, municipality, expire_date, sec] = row;
        Record([
            id,
            facility_name,
            tel_no,
            email,
            street,
            municipality,
            province.to_string(),
            expire_date,
            sec,
        ])
    }

    pub fn fields(&self) -> &[String; 9] {
        &self.0
    }

    pub fn id(&self) -> &str {
        &self.0[0]
    }

    pub fn facility_name(&self) -> &str {
        &self.0[1]
    }

    pub fn tel_no(&self) -> &str {
        &self.0[2]
    }

    pub fn email(&self) -> &str {
        &self.0[3]
    }

    pub fn street(&self) -> &str {
        &self.0[4]
    }

    pub fn municipality(&self) -> &str {
        &self.0[5]
    }

    pub fn province(&self) -> &str {
        &self.0[PROVINCE_INDEX]
    }

    pub fn expire_date(&self) -> &str {
        &self.0[7]
    }

    pub fn sec(&self) -> &str {
        &self.0[8]
    }
}
