//! [`SqliteStore`]: the SQLite implementation of [`TaxonomyStore`] and
//! [`ProfileStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _};

use skillgap_core::{
  CompetencyId, SkillId, UserId,
  competency::{Competency, normalize_name},
  progress::{CompetencyScore, UserCompetency, VerifiedSkill},
  skill::Skill,
  store::{ProfileStore, SnapshotWrite, TaxonomyStore},
  user::{NewUser, User, UserSkill},
};

use crate::{
  Result,
  encode::{
    RawCompetency, RawSkill, RawUser, RawUserCompetency, RawUserSkill,
    RawVerifiedSkill, USER_COLUMNS, decode_version, encode_dt, encode_level,
    encode_source, encode_version,
  },
  error::Error,
  schema::SCHEMA,
};

// ─── Queries ─────────────────────────────────────────────────────────────────

// Skill and competency reads select columns in the order expected by
// `RawSkill::from_row` and `RawCompetency::from_row`.

const SKILL_BY_ID: &str = "
  SELECT s.skill_id, s.skill_name, s.parent_skill_id, s.description
  FROM skills s WHERE s.skill_id = ?1";

const CHILD_SKILLS: &str = "
  SELECT s.skill_id, s.skill_name, s.parent_skill_id, s.description
  FROM skills s WHERE s.parent_skill_id = ?1 ORDER BY s.skill_id";

const ROOT_SKILLS: &str = "
  SELECT s.skill_id, s.skill_name, s.parent_skill_id, s.description
  FROM skills s WHERE s.parent_skill_id IS NULL ORDER BY s.skill_id";

const L1_SKILLS_FOR_COMPETENCY: &str = "
  SELECT s.skill_id, s.skill_name, s.parent_skill_id, s.description
  FROM competency_skills cs
  JOIN skills s ON s.skill_id = cs.skill_id
  WHERE cs.competency_id = ?1 AND s.parent_skill_id IS NULL
  ORDER BY s.skill_id";

const COMPETENCY_BY_ID: &str = "
  SELECT c.competency_id, c.competency_name, c.description, c.parent_competency_id
  FROM competencies c WHERE c.competency_id = ?1";

const COMPETENCY_BY_NAME: &str = "
  SELECT c.competency_id, c.competency_name, c.description, c.parent_competency_id
  FROM competencies c WHERE c.name_key = ?1
  ORDER BY c.competency_id LIMIT 1";

const CHILD_COMPETENCIES: &str = "
  SELECT c.competency_id, c.competency_name, c.description, c.parent_competency_id
  FROM competencies c WHERE c.parent_competency_id = ?1
  ORDER BY c.competency_id";

const COMPETENCIES_FOR_SKILL: &str = "
  SELECT c.competency_id, c.competency_name, c.description, c.parent_competency_id
  FROM competency_skills cs
  JOIN competencies c ON c.competency_id = cs.competency_id
  WHERE cs.skill_id = ?1
  ORDER BY c.competency_id";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A skillgap store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_skills(
    &self,
    sql: &'static str,
    param: Option<String>,
  ) -> Result<Vec<Skill>> {
    let raws: Vec<RawSkill> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = match param {
          Some(p) => stmt.query_map(rusqlite::params![p], RawSkill::from_row)?,
          None => stmt.query_map([], RawSkill::from_row)?,
        }
        .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSkill::into_skill).collect()
  }

  async fn query_competencies(
    &self,
    sql: &'static str,
    param: String,
  ) -> Result<Vec<Competency>> {
    let raws: Vec<RawCompetency> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(rusqlite::params![param], RawCompetency::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCompetency::into_competency).collect()
  }

  /// Run a single-row write and report whether a row changed.
  async fn execute(
    &self,
    sql: &'static str,
    params: Vec<Option<String>>,
  ) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(sql, rusqlite::params_from_iter(params))?)
      })
      .await?;
    Ok(changed > 0)
  }
}

// ─── Row readers ─────────────────────────────────────────────────────────────

fn read_snapshot(
  conn: &Connection,
  user_id: &str,
  competency_id: &str,
) -> rusqlite::Result<Vec<RawVerifiedSkill>> {
  let mut stmt = conn.prepare(
    "SELECT skill_id, skill_name, verified, last_update
     FROM user_verified_skills
     WHERE user_id = ?1 AND competency_id = ?2
     ORDER BY skill_id",
  )?;
  stmt
    .query_map(rusqlite::params![user_id, competency_id], |row| {
      Ok(RawVerifiedSkill {
        skill_id:    row.get(0)?,
        skill_name:  row.get(1)?,
        verified:    row.get(2)?,
        last_update: row.get(3)?,
      })
    })?
    .collect()
}

fn read_version(
  conn: &Connection,
  user_id: &str,
  competency_id: &str,
) -> rusqlite::Result<Option<i64>> {
  conn
    .query_row(
      "SELECT version FROM user_competencies
       WHERE user_id = ?1 AND competency_id = ?2",
      rusqlite::params![user_id, competency_id],
      |row| row.get(0),
    )
    .optional()
}

fn read_user_competency(
  conn: &Connection,
  user_id: &str,
  competency_id: &str,
) -> rusqlite::Result<Option<RawUserCompetency>> {
  let row = conn
    .query_row(
      "SELECT user_id, competency_id, coverage_percentage, proficiency_level, version
       FROM user_competencies
       WHERE user_id = ?1 AND competency_id = ?2",
      rusqlite::params![user_id, competency_id],
      |row| {
        Ok(RawUserCompetency {
          user_id:             row.get(0)?,
          competency_id:       row.get(1)?,
          coverage_percentage: row.get(2)?,
          proficiency_level:   row.get(3)?,
          version:             row.get(4)?,
          verified_skills:     Vec::new(),
        })
      },
    )
    .optional()?;

  match row {
    Some(mut raw) => {
      raw.verified_skills = read_snapshot(conn, user_id, competency_id)?;
      Ok(Some(raw))
    }
    None => Ok(None),
  }
}

fn read_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<RawUser>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
      rusqlite::params![user_id],
      RawUser::from_row,
    )
    .optional()
}

// ─── TaxonomyStore impl ──────────────────────────────────────────────────────

impl TaxonomyStore for SqliteStore {
  type Error = Error;

  // ── Skills ────────────────────────────────────────────────────────────────

  async fn get_skill_by_id(&self, id: &SkillId) -> Result<Option<Skill>> {
    let skills = self
      .query_skills(SKILL_BY_ID, Some(id.as_str().to_owned()))
      .await?;
    Ok(skills.into_iter().next())
  }

  async fn get_child_skills(&self, parent: &SkillId) -> Result<Vec<Skill>> {
    self
      .query_skills(CHILD_SKILLS, Some(parent.as_str().to_owned()))
      .await
  }

  async fn list_root_skills(&self) -> Result<Vec<Skill>> {
    self.query_skills(ROOT_SKILLS, None).await
  }

  async fn add_skill(&self, skill: &Skill) -> Result<bool> {
    self
      .execute(
        "INSERT OR IGNORE INTO skills (skill_id, skill_name, parent_skill_id, description)
         VALUES (?1, ?2, ?3, ?4)",
        vec![
          Some(skill.skill_id.to_string()),
          Some(skill.skill_name.clone()),
          skill.parent_skill_id.as_ref().map(SkillId::to_string),
          skill.description.clone(),
        ],
      )
      .await
  }

  async fn link_parent_child_skill(
    &self,
    parent: Option<&SkillId>,
    child: &SkillId,
  ) -> Result<bool> {
    self
      .execute(
        "UPDATE skills SET parent_skill_id = ?1 WHERE skill_id = ?2",
        vec![parent.map(SkillId::to_string), Some(child.to_string())],
      )
      .await
  }

  async fn delete_skill(&self, id: &SkillId) -> Result<bool> {
    // Foreign keys cascade to the subtree, links, user skills and snapshots.
    self
      .execute("DELETE FROM skills WHERE skill_id = ?1", vec![Some(id.to_string())])
      .await
  }

  // ── Competencies ──────────────────────────────────────────────────────────

  async fn get_competency_by_id(&self, id: &CompetencyId) -> Result<Option<Competency>> {
    let found = self
      .query_competencies(COMPETENCY_BY_ID, id.to_string())
      .await?;
    Ok(found.into_iter().next())
  }

  async fn get_competency_by_name(&self, name: &str) -> Result<Option<Competency>> {
    let found = self
      .query_competencies(COMPETENCY_BY_NAME, normalize_name(name))
      .await?;
    Ok(found.into_iter().next())
  }

  async fn get_child_competencies(&self, parent: &CompetencyId) -> Result<Vec<Competency>> {
    self
      .query_competencies(CHILD_COMPETENCIES, parent.to_string())
      .await
  }

  async fn add_competency(&self, competency: &Competency) -> Result<bool> {
    self
      .execute(
        "INSERT OR IGNORE INTO competencies
           (competency_id, competency_name, name_key, description, parent_competency_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        vec![
          Some(competency.competency_id.to_string()),
          Some(competency.competency_name.clone()),
          Some(normalize_name(&competency.competency_name)),
          competency.description.clone(),
          competency
            .parent_competency_id
            .as_ref()
            .map(CompetencyId::to_string),
        ],
      )
      .await
  }

  async fn set_competency_parent(
    &self,
    id: &CompetencyId,
    parent: Option<&CompetencyId>,
  ) -> Result<bool> {
    self
      .execute(
        "UPDATE competencies SET parent_competency_id = ?1 WHERE competency_id = ?2",
        vec![parent.map(CompetencyId::to_string), Some(id.to_string())],
      )
      .await
  }

  async fn delete_competency(&self, id: &CompetencyId) -> Result<bool> {
    self
      .execute(
        "DELETE FROM competencies WHERE competency_id = ?1",
        vec![Some(id.to_string())],
      )
      .await
  }

  // ── Links ─────────────────────────────────────────────────────────────────

  async fn link_skill_to_competency(
    &self,
    competency: &CompetencyId,
    skill: &SkillId,
  ) -> Result<()> {
    self
      .execute(
        "INSERT OR IGNORE INTO competency_skills (competency_id, skill_id) VALUES (?1, ?2)",
        vec![Some(competency.to_string()), Some(skill.to_string())],
      )
      .await?;
    Ok(())
  }

  async fn get_l1_skills_for_competency(
    &self,
    competency: &CompetencyId,
  ) -> Result<Vec<Skill>> {
    self
      .query_skills(L1_SKILLS_FOR_COMPETENCY, Some(competency.to_string()))
      .await
  }

  async fn get_competencies_for_skill(&self, skill: &SkillId) -> Result<Vec<Competency>> {
    self
      .query_competencies(COMPETENCIES_FOR_SKILL, skill.to_string())
      .await
  }
}

// ─── ProfileStore impl ───────────────────────────────────────────────────────

impl ProfileStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
    let id_str = id.to_string();
    let raw = self
      .conn
      .call(move |conn| Ok(read_user(conn, &id_str)?))
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn upsert_user(&self, user: NewUser) -> Result<User> {
    let now = encode_dt(Utc::now());
    let id_str = user.user_id.to_string();

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             user_id, user_name, company_id, employee_type, path_career,
             raw_data, relevance_score, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
           ON CONFLICT (user_id) DO UPDATE SET
             user_name     = excluded.user_name,
             company_id    = excluded.company_id,
             employee_type = excluded.employee_type,
             path_career   = excluded.path_career,
             raw_data      = excluded.raw_data,
             updated_at    = excluded.updated_at",
          rusqlite::params![
            id_str,
            user.user_name,
            user.company_id,
            user.employee_type,
            user.path_career,
            user.raw_data,
            now,
          ],
        )?;
        Ok(read_user(conn, &id_str)?)
      })
      .await?;

    raw
      .ok_or_else(|| Error::Decode("upserted user row is missing".into()))?
      .into_user()
  }

  async fn update_relevance_score(&self, id: &UserId, score: f64) -> Result<()> {
    let id_str = id.to_string();
    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users SET relevance_score = ?1, updated_at = ?2 WHERE user_id = ?3",
          rusqlite::params![score, now, id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── User skills ───────────────────────────────────────────────────────────

  async fn upsert_user_skill(&self, record: UserSkill) -> Result<()> {
    let source = encode_source(record.source);
    let last_update = encode_dt(record.last_update);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_skills (user_id, skill_id, skill_name, verified, source, last_update)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (user_id, skill_id) DO UPDATE SET
             skill_name  = excluded.skill_name,
             verified    = excluded.verified,
             source      = excluded.source,
             last_update = excluded.last_update",
          rusqlite::params![
            record.user_id.as_str(),
            record.skill_id.as_str(),
            record.skill_name,
            record.verified,
            source,
            last_update,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_user_skills(&self, user: &UserId) -> Result<Vec<UserSkill>> {
    let id_str = user.to_string();
    let raws: Vec<RawUserSkill> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, skill_id, skill_name, verified, source, last_update
           FROM user_skills WHERE user_id = ?1 ORDER BY skill_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawUserSkill {
              user_id:     row.get(0)?,
              skill_id:    row.get(1)?,
              skill_name:  row.get(2)?,
              verified:    row.get(3)?,
              source:      row.get(4)?,
              last_update: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUserSkill::into_user_skill).collect()
  }

  // ── User competencies ─────────────────────────────────────────────────────

  async fn get_user_competencies(&self, user: &UserId) -> Result<Vec<UserCompetency>> {
    let id_str = user.to_string();
    let raws: Vec<RawUserCompetency> = self
      .conn
      .call(move |conn| {
        let competency_ids: Vec<String> = {
          let mut stmt = conn.prepare(
            "SELECT competency_id FROM user_competencies
             WHERE user_id = ?1 ORDER BY competency_id",
          )?;
          stmt
            .query_map(rusqlite::params![id_str], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?
        };

        let mut rows = Vec::with_capacity(competency_ids.len());
        for competency_id in competency_ids {
          if let Some(raw) = read_user_competency(conn, &id_str, &competency_id)? {
            rows.push(raw);
          }
        }
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawUserCompetency::into_user_competency)
      .collect()
  }

  async fn get_user_competency(
    &self,
    user: &UserId,
    competency: &CompetencyId,
  ) -> Result<Option<UserCompetency>> {
    let user_str = user.to_string();
    let competency_str = competency.to_string();
    let raw = self
      .conn
      .call(move |conn| Ok(read_user_competency(conn, &user_str, &competency_str)?))
      .await?;
    raw.map(RawUserCompetency::into_user_competency).transpose()
  }

  async fn create_user_competency(
    &self,
    user: &UserId,
    competency: &CompetencyId,
  ) -> Result<UserCompetency> {
    let user_str = user.to_string();
    let competency_str = competency.to_string();
    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT OR IGNORE INTO user_competencies (user_id, competency_id) VALUES (?1, ?2)",
          rusqlite::params![user_str, competency_str],
        )?;
        let raw = read_user_competency(&tx, &user_str, &competency_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw
      .ok_or_else(|| Error::Decode("created user competency row is missing".into()))?
      .into_user_competency()
  }

  async fn update_user_competency(
    &self,
    user: &UserId,
    competency: &CompetencyId,
    score: CompetencyScore,
    expected_version: u64,
  ) -> Result<SnapshotWrite> {
    let user_str = user.to_string();
    let competency_str = competency.to_string();
    let expected = encode_version(expected_version)?;
    let level = encode_level(score.proficiency_level);

    let current: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let current = read_version(&tx, &user_str, &competency_str)?;
        if current != Some(expected) {
          return Ok(current);
        }
        tx.execute(
          "UPDATE user_competencies
           SET coverage_percentage = ?1, proficiency_level = ?2
           WHERE user_id = ?3 AND competency_id = ?4",
          rusqlite::params![score.coverage_percentage, level, user_str, competency_str],
        )?;
        tx.commit()?;
        Ok(current)
      })
      .await?;

    Ok(match current {
      None => SnapshotWrite::Missing,
      Some(version) if version == expected => {
        SnapshotWrite::Applied { version: expected_version }
      }
      Some(version) => SnapshotWrite::Conflict { current: decode_version(version)? },
    })
  }

  async fn update_verified_skills(
    &self,
    user: &UserId,
    competency: &CompetencyId,
    skills: Vec<VerifiedSkill>,
    score: CompetencyScore,
    expected_version: u64,
  ) -> Result<SnapshotWrite> {
    let user_str = user.to_string();
    let competency_str = competency.to_string();
    let expected = encode_version(expected_version)?;
    let level = encode_level(score.proficiency_level);
    let entries: Vec<(String, String, bool, String)> = skills
      .into_iter()
      .map(|vs| {
        (vs.skill_id.into(), vs.skill_name, vs.verified, encode_dt(vs.last_update))
      })
      .collect();

    let (current, applied): (Option<i64>, bool) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        match read_version(&tx, &user_str, &competency_str)? {
          Some(version) if version == expected => {}
          other => return Ok((other, false)),
        }

        tx.execute(
          "DELETE FROM user_verified_skills WHERE user_id = ?1 AND competency_id = ?2",
          rusqlite::params![user_str, competency_str],
        )?;
        {
          let mut insert = tx.prepare(
            "INSERT INTO user_verified_skills
               (user_id, competency_id, skill_id, skill_name, verified, last_update)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          )?;
          for (skill_id, skill_name, verified, last_update) in &entries {
            insert.execute(rusqlite::params![
              user_str,
              competency_str,
              skill_id,
              skill_name,
              verified,
              last_update,
            ])?;
          }
        }
        tx.execute(
          "UPDATE user_competencies
           SET coverage_percentage = ?1, proficiency_level = ?2, version = version + 1
           WHERE user_id = ?3 AND competency_id = ?4",
          rusqlite::params![score.coverage_percentage, level, user_str, competency_str],
        )?;
        tx.commit()?;
        Ok((Some(expected + 1), true))
      })
      .await?;

    Ok(match (current, applied) {
      (None, _) => SnapshotWrite::Missing,
      (Some(version), true) => SnapshotWrite::Applied { version: decode_version(version)? },
      (Some(version), false) => SnapshotWrite::Conflict { current: decode_version(version)? },
    })
  }
}
