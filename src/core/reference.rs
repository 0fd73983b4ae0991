//! Reference data: seeding from configuration and lookups for forms.

use crate::{
    config::settings::ReferenceData,
    entities::{
        AttendancePolicy, Branch, Department, Designation, DocumentType, JobPosting,
        OfferTemplate, Role, Shift, Source, attendance_policy, branch, department, designation,
        document_type, job_posting, offer_template, role, shift, source,
    },
    errors::Result,
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;

/// Inserts each name into a `(id, name)` table unless already present.
macro_rules! seed_names {
    ($db:expr, $entity:ident, $module:ident, $names:expr) => {
        for name in $names {
            let exists = $entity::find()
                .filter($module::Column::Name.eq(name.as_str()))
                .one($db)
                .await?
                .is_some();
            if !exists {
                $module::ActiveModel {
                    name: Set(name.clone()),
                    ..Default::default()
                }
                .insert($db)
                .await?;
            }
        }
    };
}

/// Seeds reference data idempotently, matching existing rows by name.
pub async fn seed_reference_data(db: &DatabaseConnection, data: &ReferenceData) -> Result<()> {
    let txn = db.begin().await?;

    seed_names!(&txn, Branch, branch, &data.branches);
    seed_names!(&txn, Shift, shift, &data.shifts);
    seed_names!(&txn, AttendancePolicy, attendance_policy, &data.attendance_policies);
    seed_names!(&txn, Source, source, &data.sources);
    seed_names!(&txn, DocumentType, document_type, &data.document_types);

    for seed in &data.departments {
        let dept = match Department::find()
            .filter(department::Column::Name.eq(seed.name.as_str()))
            .one(&txn)
            .await?
        {
            Some(d) => d,
            None => {
                department::ActiveModel {
                    name: Set(seed.name.clone()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };
        for title in &seed.designations {
            let exists = Designation::find()
                .filter(designation::Column::DepartmentId.eq(dept.id))
                .filter(designation::Column::Name.eq(title.as_str()))
                .one(&txn)
                .await?
                .is_some();
            if !exists {
                designation::ActiveModel {
                    department_id: Set(dept.id),
                    name: Set(title.clone()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }
    }

    for seed in &data.job_postings {
        let exists = JobPosting::find()
            .filter(job_posting::Column::JobCode.eq(seed.job_code.as_str()))
            .one(&txn)
            .await?
            .is_some();
        if exists {
            continue;
        }
        let department_id = match &seed.department {
            Some(name) => Department::find()
                .filter(department::Column::Name.eq(name.as_str()))
                .one(&txn)
                .await?
                .map(|d| d.id),
            None => None,
        };
        if seed.department.is_some() && department_id.is_none() {
            tracing::warn!(
                "Job posting {} names unknown department {:?}",
                seed.job_code,
                seed.department
            );
        }
        job_posting::ActiveModel {
            job_code: Set(seed.job_code.clone()),
            title: Set(seed.title.clone()),
            location: Set(seed.location.clone()),
            job_type: Set(seed.job_type.clone()),
            department_id: Set(department_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    for seed in &data.offer_templates {
        let exists = OfferTemplate::find()
            .filter(offer_template::Column::Name.eq(seed.name.as_str()))
            .one(&txn)
            .await?
            .is_some();
        if !exists {
            offer_template::ActiveModel {
                name: Set(seed.name.clone()),
                body: Set(seed.body.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }

    for seed in &data.roles {
        let exists = Role::find()
            .filter(role::Column::Name.eq(seed.name.as_str()))
            .one(&txn)
            .await?
            .is_some();
        if !exists {
            role::ActiveModel {
                name: Set(seed.name.clone()),
                permissions: Set(serde_json::json!(seed.permissions)),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }

    txn.commit().await?;
    tracing::info!("Reference data seeded");
    Ok(())
}

/// A department with its designations, for placement pickers.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentOption {
    #[serde(flatten)]
    pub department: department::Model,
    pub designations: Vec<designation::Model>,
}

/// Everything the create and edit forms choose from.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceOptions {
    pub branches: Vec<branch::Model>,
    pub departments: Vec<DepartmentOption>,
    pub shifts: Vec<shift::Model>,
    pub attendance_policies: Vec<attendance_policy::Model>,
    pub sources: Vec<source::Model>,
    pub document_types: Vec<document_type::Model>,
    pub job_postings: Vec<job_posting::Model>,
    pub offer_templates: Vec<offer_template::Model>,
    pub roles: Vec<role::Model>,
}

/// Loads all reference data ordered by name.
pub async fn load_reference_options<C>(db: &C) -> Result<ReferenceOptions>
where
    C: ConnectionTrait,
{
    let departments = Department::find()
        .order_by_asc(department::Column::Name)
        .find_with_related(Designation)
        .all(db)
        .await?
        .into_iter()
        .map(|(department, designations)| DepartmentOption {
            department,
            designations,
        })
        .collect();

    Ok(ReferenceOptions {
        branches: Branch::find().order_by_asc(branch::Column::Name).all(db).await?,
        departments,
        shifts: Shift::find().order_by_asc(shift::Column::Name).all(db).await?,
        attendance_policies: AttendancePolicy::find()
            .order_by_asc(attendance_policy::Column::Name)
            .all(db)
            .await?,
        sources: Source::find().order_by_asc(source::Column::Name).all(db).await?,
        document_types: DocumentType::find()
            .order_by_asc(document_type::Column::Name)
            .all(db)
            .await?,
        job_postings: JobPosting::find()
            .order_by_asc(job_posting::Column::Title)
            .all(db)
            .await?,
        offer_templates: OfferTemplate::find()
            .order_by_asc(offer_template::Column::Name)
            .all(db)
            .await?,
        roles: Role::find().order_by_asc(role::Column::Name).all(db).await?,
    })
}
