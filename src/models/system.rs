use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuInfo {
    pub brand:     String,   // "AMD"
    pub model:     String,   // "Ryzen 7 5800H with Radeon Graphics"
    pub cores:     usize,
    pub threads:   usize,
    pub frequency: String,   // GHz, "3.20"
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemInfo {
    #[serde(rename = "totalMB")]
    pub total_mb:     u64,
    #[serde(rename = "usedMB")]
    pub used_mb:      u64,
    #[serde(rename = "freeMB")]
    pub free_mb:      u64,
    pub used_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OsInfo {
    pub id:       String,
    #[serde(rename = "os")]
    pub name:     String,
    pub arch:     String,
    pub kernel:   String,
    pub uptime:   String,
    pub hostname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub label: String,
    pub value: f64,
    pub unit:  String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub extra: String,
}

/// One chip block from `sensors` output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorChip {
    pub name:     String,
    pub adapter:  String,
    pub readings: Vec<SensorReading>,
}
