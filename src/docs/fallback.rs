//! Static backup text served when a live fetch fails.

pub const UNIVERSITY_SITE: &str = "RV UNIVERSITY - BENGALURU (Backup Information)

ABOUT
RV University is a multidisciplinary university in Bengaluru established by the RV Educational Institutions.
The university focuses on liberal education, research and industry engagement.

SCHOOLS AND PROGRAMS
School of Computer Science and Engineering: B.Tech (Hons) programs in Computer Science and allied specialisations.
School of Business: BBA (Hons) and MBA programs with electives in finance, marketing and analytics.
School of Law: BA LLB (Hons) and BBA LLB (Hons) integrated law degree programs.
School of Liberal Arts and Sciences: undergraduate programs in economics, psychology, design and science.

ADMISSIONS
Admission to each course is based on the university entrance process, academic record and a personal interview.
Scholarships are available for meritorious students and are reviewed every year.

CAMPUS
The campus offers a central library, hostel accommodation for students, sports facilities and research labs.

PLACEMENTS
A dedicated placement cell runs recruitment drives and internship programs with partner companies.

CONTACT
Address: RV University, 8th Mile, Mysore Road, Bengaluru - 560059.
Phone: +91-80-6819-9100
Email: admissions@rvu.edu.in
";

pub const QUESTION_PAPER_PORTAL: &str = "UNIVAULT - QUESTION PAPERS PORTAL (Backup Information)

Univault is the student-run repository of previous year question papers for RV University.
Question papers are organised by school, semester and subject.
Each subject page lists midterm and final exam papers as downloadable PDF files.
Papers from the previous year are added after every exam cycle.
Students can browse by semester to find papers for the courses they are enrolled in.
";
