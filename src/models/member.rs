use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{double_option, Document};
use crate::database::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EducationLevel {
    #[serde(rename = "Grade 1")]
    Grade1,
    #[serde(rename = "Grade 2")]
    Grade2,
    #[serde(rename = "Grade 3")]
    Grade3,
    #[serde(rename = "Grade 4")]
    Grade4,
    #[serde(rename = "Grade 5")]
    Grade5,
    #[serde(rename = "Grade 6")]
    Grade6,
    #[serde(rename = "Grade 7")]
    Grade7,
    #[serde(rename = "Grade 8")]
    Grade8,
    #[serde(rename = "Grade 9")]
    Grade9,
    #[serde(rename = "Grade 10")]
    Grade10,
    #[serde(rename = "Grade 11")]
    Grade11,
    #[serde(rename = "Grade 12")]
    Grade12,
    College,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberRole {
    Admin,
    Priest,
    Deacon,
    #[serde(rename = "Choir Member")]
    ChoirMember,
    #[serde(rename = "Sunday School Student")]
    SundaySchoolStudent,
    #[serde(rename = "Sunday School Teacher")]
    SundaySchoolTeacher,
    Treasurer,
    Secretary,
    #[default]
    Member,
    Guest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiveStatus {
    #[default]
    Active,
    Deceased,
    Transfer,
}

/// Individual member record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grandfather_name: Option<String>,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub christianity_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education_level: Option<EducationLevel>,
    #[serde(default)]
    pub role: MemberRole,
    #[serde(default)]
    pub live_status: LiveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parish: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother_father_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soul_father_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Set only by recording a death.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn full_name(&self) -> String {
        [Some(&self.first_name), self.father_name.as_ref(), self.grandfather_name.as_ref()]
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whole years completed on `today`.
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        let dob = self.date_of_birth;
        let mut age = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        age.max(0)
    }
}

impl Document for Member {
    const COLLECTION: Collection = Collection::Members;

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Member as returned by the API, with derived fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    #[serde(flatten)]
    pub member: Member,
    pub full_name: String,
    pub age: i32,
}

impl From<Member> for MemberView {
    fn from(member: Member) -> Self {
        let today = Utc::now().date_naive();
        Self {
            full_name: member.full_name(),
            age: member.age_on(today),
            member,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPayload {
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub father_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub grandfather_name: Option<Option<String>>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub christianity_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub education_level: Option<Option<EducationLevel>>,
    pub role: Option<MemberRole>,
    pub live_status: Option<LiveStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub emergency_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parish: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub mother_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub mother_father_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub soul_father_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub photo_url: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member(dob: &str) -> Member {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "firstName": "Abebe",
            "fatherName": "Kebede",
            "gender": "Male",
            "dateOfBirth": dob,
            "role": "Choir Member",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn defaults_and_enum_spellings() {
        let m = member("1990-05-10");
        assert_eq!(m.role, MemberRole::ChoirMember);
        assert_eq!(m.live_status, LiveStatus::Active);
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["role"], "Choir Member");
        assert_eq!(v["liveStatus"], "Active");
        assert!(v.get("phone").is_none());
    }

    #[test]
    fn age_counts_completed_years() {
        let m = member("1990-05-10");
        let day_before = NaiveDate::from_ymd_opt(2020, 5, 9).unwrap();
        let birthday = NaiveDate::from_ymd_opt(2020, 5, 10).unwrap();
        assert_eq!(m.age_on(day_before), 29);
        assert_eq!(m.age_on(birthday), 30);
    }

    #[test]
    fn view_flattens_member_fields() {
        let view = MemberView::from(member("1990-05-10"));
        let v = serde_json::to_value(&view).unwrap();
        assert_eq!(v["fullName"], "Abebe Kebede");
        assert_eq!(v["firstName"], "Abebe");
        assert!(v["age"].as_i64().unwrap() >= 30);
    }

    #[test]
    fn education_levels_use_spaced_names() {
        let level: EducationLevel = serde_json::from_value(json!("Grade 12")).unwrap();
        assert_eq!(level, EducationLevel::Grade12);
        assert!(serde_json::from_value::<EducationLevel>(json!("Grade 13")).is_err());
    }
}
