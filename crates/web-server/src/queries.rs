//! SQL behind the dashboard endpoints.

pub const DEPARTMENTS: &str = r#"
    SELECT d.id, d.name, d.manager, COUNT(i.id) FILTER (WHERE i.status = 'active')::int AS intern_count
    FROM departments AS d
    LEFT JOIN interns AS i ON i.department_id = d.id
    GROUP BY d.id, d.name, d.manager
    ORDER BY d.id
"#;

/// `$1` is an optional department name; NULL means every department.
pub const INTERNS: &str = r#"
    SELECT i.id, i.first_name, i.last_name, i.email,
           d.name AS department, h.name AS housing,
           i.start_date, i.end_date, i.status
    FROM interns AS i
    LEFT JOIN departments AS d ON d.id = i.department_id
    LEFT JOIN housing_units AS h ON h.id = i.housing_unit_id
    WHERE ($1::text IS NULL OR LOWER(d.name) = LOWER($1::text))
    ORDER BY i.id
"#;

pub const INTERN_BY_ID: &str = r#"
    SELECT i.id, i.first_name, i.last_name, i.email,
           d.name AS department, h.name AS housing,
           i.start_date, i.end_date, i.status
    FROM interns AS i
    LEFT JOIN departments AS d ON d.id = i.department_id
    LEFT JOIN housing_units AS h ON h.id = i.housing_unit_id
    WHERE i.id = $1
"#;

pub const HOUSING: &str = r#"
    SELECT h.id, h.name, h.address, h.capacity,
           COUNT(i.id)::int AS occupied,
           (h.capacity - COUNT(i.id))::int AS available
    FROM housing_units AS h
    LEFT JOIN interns AS i ON i.housing_unit_id = h.id AND i.status = 'active'
    GROUP BY h.id, h.name, h.address, h.capacity
    ORDER BY h.id
"#;

pub const SUMMARY: &str = r#"
    SELECT
        (SELECT COUNT(*) FROM interns)::int AS total_interns,
        (SELECT COUNT(*) FROM interns WHERE status = 'active')::int AS active_interns,
        (SELECT COUNT(*) FROM departments)::int AS departments,
        (SELECT COALESCE(SUM(capacity), 0) FROM housing_units)::int AS housing_capacity,
        (SELECT COUNT(*) FROM interns WHERE status = 'active' AND housing_unit_id IS NOT NULL)::int AS housed_interns
"#;

pub const DEPARTMENT_DISTRIBUTION: &str = r#"
    SELECT d.name AS department, COUNT(i.id)::int AS interns
    FROM interns AS i
    JOIN departments AS d ON d.id = i.department_id
    WHERE i.status = 'active'
    GROUP BY d.name
    ORDER BY interns DESC, d.name
"#;
